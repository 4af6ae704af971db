use crate::error::{NodeError, Result};
use crate::network::message::{encode_peer_list, write_message, Message};
use log::{debug, info, warn};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Bound on a single frame write before the connection is given up
const TCP_WRITE_TIMEOUT: u64 = 5000;

/// Frames queued for one connection before it counts as stalled
pub const OUTBOX_CAPACITY: usize = 64;

/// One accepted client. Frames reach the socket through `outbox` and a
/// writer thread, so nothing writes to a socket while the registry is locked.
struct PeerConnection {
    addr: SocketAddr,
    stream: TcpStream,
    outbox: SyncSender<Arc<Message>>,
}

impl PeerConnection {
    fn open(addr: SocketAddr, stream: TcpStream) -> Result<Self> {
        stream
            .set_write_timeout(Some(Duration::from_millis(TCP_WRITE_TIMEOUT)))
            .map_err(|e| NodeError::Network(format!("Failed to set write timeout: {e}")))?;
        let mut writer = stream
            .try_clone()
            .map_err(|e| NodeError::Network(format!("Failed to clone stream: {e}")))?;

        let (outbox, queue) = mpsc::sync_channel::<Arc<Message>>(OUTBOX_CAPACITY);
        thread::spawn(move || {
            for message in queue {
                if let Err(e) = write_message(&mut writer, &message) {
                    // Part of the frame may be out, nothing may follow it
                    warn!("Closing connection to {addr}: {e}");
                    let _ = writer.shutdown(Shutdown::Both);
                    return;
                }
            }
            debug!("Writer for {addr} finished");
        });

        Ok(Self {
            addr,
            stream,
            outbox,
        })
    }

    /// Hand a frame to the writer thread without blocking
    fn queue(&self, message: &Arc<Message>) -> bool {
        match self.outbox.try_send(Arc::clone(message)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "{} has {OUTBOX_CAPACITY} frames pending, dropping it",
                    self.addr
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Writer for {} is gone", self.addr);
                false
            }
        }
    }

    fn close(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Peer set and connection set of the relay server
///
/// A peer and its connection live in the same entry, so they are added and
/// removed together. Every mutation and every enqueue runs under one lock:
/// membership changes are applied in a single order and each connection sees
/// frames in the order they were queued. A connection whose outbox is full is
/// closed and dropped on the spot.
pub struct PeerRegistry {
    connections: Mutex<Vec<PeerConnection>>,
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(vec![]),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<PeerConnection>>> {
        self.connections
            .lock()
            .map_err(|e| NodeError::Network(format!("Failed to acquire peer lock: {e}")))
    }

    /// Add a peer and announce the new peer list to everyone, the newcomer included
    pub fn register(&self, addr: SocketAddr, stream: TcpStream) -> Result<()> {
        let connection = PeerConnection::open(addr, stream)?;

        let mut connections = self.lock()?;
        connections.push(connection);
        info!("Connected to peer: {addr}");
        announce_peers(&mut connections);
        Ok(())
    }

    /// Remove a peer, close its stream and announce the remaining peer list.
    /// Returns false if the peer was already gone.
    pub fn evict(&self, addr: SocketAddr) -> Result<bool> {
        let mut connections = self.lock()?;
        let Some(idx) = connections.iter().position(|c| c.addr == addr) else {
            return Ok(false);
        };

        let removed = connections.remove(idx);
        removed.close();
        info!("Disconnected from peer: {addr}");
        announce_peers(&mut connections);
        Ok(true)
    }

    /// Send the current peer list to every connection
    pub fn broadcast_peers(&self) -> Result<()> {
        let mut connections = self.lock()?;
        announce_peers(&mut connections);
        Ok(())
    }

    /// Queue `message` for every connection. Returns how many took it.
    pub fn broadcast(&self, message: &Message) -> Result<usize> {
        let mut connections = self.lock()?;
        let message = Arc::new(message.clone());
        if queue_all(&mut connections, &message) {
            announce_peers(&mut connections);
        }
        Ok(connections.len())
    }

    /// Queue `message` for a single peer
    pub fn send_to(&self, addr: SocketAddr, message: &Message) -> Result<()> {
        let mut connections = self.lock()?;
        let idx = connections
            .iter()
            .position(|c| c.addr == addr)
            .ok_or_else(|| NodeError::Network(format!("Unknown peer {addr}")))?;

        if connections[idx].queue(&Arc::new(message.clone())) {
            return Ok(());
        }
        let dropped = connections.remove(idx);
        dropped.close();
        announce_peers(&mut connections);
        Err(NodeError::Network(format!("Dropped stalled peer {addr}")))
    }

    /// Peer addresses in accept order
    pub fn peers(&self) -> Result<Vec<SocketAddr>> {
        let connections = self.lock()?;
        Ok(connections.iter().map(|c| c.addr).collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    pub fn contains(&self, addr: SocketAddr) -> Result<bool> {
        Ok(self.lock()?.iter().any(|c| c.addr == addr))
    }
}

fn peer_list_message(connections: &[PeerConnection]) -> Message {
    let addrs: Vec<SocketAddr> = connections.iter().map(|c| c.addr).collect();
    Message::new_peers(encode_peer_list(&addrs))
}

// Callers hold the registry lock. Returns true if a connection was dropped.
fn queue_all(connections: &mut Vec<PeerConnection>, message: &Arc<Message>) -> bool {
    let before = connections.len();
    connections.retain(|connection| {
        let queued = connection.queue(message);
        if !queued {
            connection.close();
        }
        queued
    });
    connections.len() != before
}

// Repeats until a list reaches every remaining connection
fn announce_peers(connections: &mut Vec<PeerConnection>) {
    loop {
        let message = Arc::new(peer_list_message(connections));
        if !queue_all(connections, &message) {
            break;
        }
    }
    info!("Peers queued for {} connection(s)", connections.len());
}
