use crate::error::{NodeError, Result};
use crate::network::message::{
    read_message, Message, DISCONNECT_SIGNAL, PEERS_REPLY_PREFIX, SHOW_PEERS_COMMAND,
};
use crate::network::PeerRegistry;
use log::{error, info, warn};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;

/// Relay server: accepts clients, tracks them and fans their messages out
pub struct Server {
    listener: TcpListener,
    registry: Arc<PeerRegistry>,
}

impl Server {
    /// Bind the listening socket
    pub fn bind<A: ToSocketAddrs + std::fmt::Debug>(addr: A) -> Result<Self> {
        let listener = TcpListener::bind(&addr)
            .map_err(|e| NodeError::Network(format!("Failed to bind to {addr:?}: {e}")))?;

        Ok(Self {
            listener,
            registry: Arc::new(PeerRegistry::new()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| NodeError::Network(format!("Failed to read local address: {e}")))
    }

    /// Shared handle on the peer set
    pub fn registry(&self) -> Arc<PeerRegistry> {
        Arc::clone(&self.registry)
    }

    /// Accept connections forever, one handler thread per client
    pub fn run(&self) -> Result<()> {
        println!("==> Server running.");
        info!("Server listening on {}", self.local_addr()?);

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(e) = self.accept(stream) {
                        error!("Failed to set up connection: {e}");
                    }
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }

        Ok(())
    }

    fn accept(&self, stream: TcpStream) -> Result<()> {
        let peer_addr = stream
            .peer_addr()
            .map_err(|e| NodeError::Network(format!("Failed to get peer address: {e}")))?;
        let reader = stream
            .try_clone()
            .map_err(|e| NodeError::Network(format!("Failed to clone stream: {e}")))?;

        self.registry.register(peer_addr, stream)?;

        let registry = Arc::clone(&self.registry);
        thread::spawn(move || {
            let result = handle_connection(&registry, reader, peer_addr);

            if let Err(e) = registry.evict(peer_addr) {
                warn!("Failed to record disconnection: {e}");
            }
            println!("==> {peer_addr} disconnected");

            if let Err(e) = result {
                error!("Error handling connection from {peer_addr}: {e}");
            }
        });

        println!("==> {peer_addr} connected.");
        Ok(())
    }
}

/// Serve one client until it leaves. Returning, for any reason, means the
/// caller evicts the peer.
pub fn handle_connection(
    registry: &PeerRegistry,
    mut stream: TcpStream,
    peer_addr: SocketAddr,
) -> Result<()> {
    loop {
        let message = match read_message(&mut stream) {
            Ok(Some(message)) => message,
            Ok(None) => {
                info!("{peer_addr} closed the connection");
                return Ok(());
            }
            Err(NodeError::Protocol(e)) => {
                warn!("Undecodable message from {peer_addr}: {e}");
                continue;
            }
            Err(e) => return Err(e),
        };

        if message.is_raw(DISCONNECT_SIGNAL) {
            info!("{peer_addr} sent the disconnect signal");
            return Ok(());
        }

        if message.is_raw(SHOW_PEERS_COMMAND) {
            let peers: Vec<String> = registry.peers()?.iter().map(|p| p.to_string()).collect();
            let reply = Message::raw(format!("{PEERS_REPLY_PREFIX}{}", peers.join(", ")));
            registry.send_to(peer_addr, &reply)?;
            continue;
        }

        // Relayed to everyone, the sender included
        let delivered = registry.broadcast(&message)?;
        info!(
            "Relayed {:?} message from {peer_addr} to {delivered} connection(s)",
            message.get_tag()
        );
    }
}
