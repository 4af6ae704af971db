//! Wire protocol shared by the server and the client
//!
//! A message is one tag byte followed by a UTF-8 payload:
//!
//! - `0x10` new transaction (JSON text of a transaction)
//! - `0x11` new peers (comma separated addresses, trailing comma)
//! - `0x12` new block (JSON text of a mined block)
//!
//! Anything whose first byte is not one of those tags is a raw, human readable
//! message and is shown as-is.
//!
//! The tag byte alone does not delimit messages on a stream socket: one read
//! can return half a message or several glued together. Every message is
//! therefore sent inside a frame made of a big-endian `u32` body length and the
//! body itself, so one `read_message` call always yields one logical message.

use crate::error::{NodeError, Result};
use log::warn;
use std::io::{self, ErrorKind, Read, Write};
use std::net::SocketAddr;

pub const TAG_NEW_TRANSACTION: u8 = 0x10;
pub const TAG_NEW_PEERS: u8 = 0x11;
pub const TAG_NEW_BLOCK: u8 = 0x12;

/// Largest frame body accepted from the wire
pub const MAX_FRAME_SIZE: usize = 1024 * 1024; // 1 MiB

/// Raw message a client sends right before it leaves
pub const DISCONNECT_SIGNAL: &str = "q";
/// Raw message asking the server for its peer list
pub const SHOW_PEERS_COMMAND: &str = "cmd_show_peers";
/// Prefix of the server's reply to `cmd_show_peers`
pub const PEERS_REPLY_PREFIX: &str = "---";

const PEER_SEPARATOR: char = ',';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTag {
    NewTransaction,
    NewPeers,
    NewBlock,
    Raw,
}

impl MessageTag {
    pub fn from_byte(byte: u8) -> Option<MessageTag> {
        match byte {
            TAG_NEW_TRANSACTION => Some(MessageTag::NewTransaction),
            TAG_NEW_PEERS => Some(MessageTag::NewPeers),
            TAG_NEW_BLOCK => Some(MessageTag::NewBlock),
            _ => None,
        }
    }

    pub fn as_byte(self) -> Option<u8> {
        match self {
            MessageTag::NewTransaction => Some(TAG_NEW_TRANSACTION),
            MessageTag::NewPeers => Some(TAG_NEW_PEERS),
            MessageTag::NewBlock => Some(TAG_NEW_BLOCK),
            MessageTag::Raw => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    tag: MessageTag,
    payload: String,
}

impl Message {
    pub fn new(tag: MessageTag, payload: impl Into<String>) -> Message {
        Message {
            tag,
            payload: payload.into(),
        }
    }

    pub fn new_transaction(payload: impl Into<String>) -> Message {
        Self::new(MessageTag::NewTransaction, payload)
    }

    pub fn new_peers(payload: impl Into<String>) -> Message {
        Self::new(MessageTag::NewPeers, payload)
    }

    pub fn new_block(payload: impl Into<String>) -> Message {
        Self::new(MessageTag::NewBlock, payload)
    }

    pub fn raw(payload: impl Into<String>) -> Message {
        Self::new(MessageTag::Raw, payload)
    }

    pub fn get_tag(&self) -> MessageTag {
        self.tag
    }

    pub fn get_payload(&self) -> &str {
        self.payload.as_str()
    }

    pub fn is_raw(&self, text: &str) -> bool {
        self.tag == MessageTag::Raw && self.payload == text
    }

    /// Frame body: tag byte (if any) followed by the payload bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.payload.len() + 1);
        if let Some(tag) = self.tag.as_byte() {
            body.push(tag);
        }
        body.extend_from_slice(self.payload.as_bytes());
        body
    }

    /// Inverse of [`Message::encode`]. Fails only when the payload is not UTF-8.
    pub fn decode(body: &[u8]) -> Result<Message> {
        let (tag, payload) = match body.first().copied().and_then(MessageTag::from_byte) {
            Some(tag) => (tag, &body[1..]),
            None => (MessageTag::Raw, body),
        };
        let payload = String::from_utf8(payload.to_vec())?;
        Ok(Message { tag, payload })
    }
}

/// Write one framed message
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> Result<()> {
    let body = message.encode();
    let len = u32::try_from(body.len())
        .ok()
        .filter(|len| *len as usize <= MAX_FRAME_SIZE)
        .ok_or_else(|| {
            NodeError::Protocol(format!(
                "Message of {} bytes exceeds frame limit",
                body.len()
            ))
        })?;

    let mut frame = Vec::with_capacity(body.len() + 4);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&body);
    writer
        .write_all(&frame)
        .and_then(|_| writer.flush())
        .map_err(|e| NodeError::Network(format!("Failed to send message: {e}")))
}

/// Read one framed message.
///
/// Returns `Ok(None)` when the peer closed the stream at a frame boundary.
/// An undecodable body is consumed in full and reported as a protocol error,
/// so the stream stays usable afterwards.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Option<Message>> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        match reader.read(&mut len_buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(NodeError::Network(
                    "Connection closed inside a frame header".to_string(),
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(NodeError::Network(format!("Failed to receive: {e}"))),
        }
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        warn!("Discarding frame of {len} bytes");
        let skipped = io::copy(&mut reader.take(len as u64), &mut io::sink())
            .map_err(|e| NodeError::Network(format!("Failed to receive: {e}")))?;
        if skipped != len as u64 {
            return Err(NodeError::Network(
                "Connection closed inside a frame body".to_string(),
            ));
        }
        return Err(NodeError::Protocol(format!(
            "Frame of {len} bytes exceeds limit of {MAX_FRAME_SIZE}"
        )));
    }

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .map_err(|e| NodeError::Network(format!("Failed to receive frame body: {e}")))?;
    Message::decode(&body).map(Some)
}

/// Peer list payload: every address followed by a separator
pub fn encode_peer_list(peers: &[SocketAddr]) -> String {
    let mut list = String::new();
    for peer in peers {
        list.push_str(&peer.to_string());
        list.push(PEER_SEPARATOR);
    }
    list
}

/// Split a peer list payload, dropping the empty element after the last separator
pub fn parse_peer_list(payload: &str) -> Vec<String> {
    let mut peers: Vec<String> = payload.split(PEER_SEPARATOR).map(String::from).collect();
    if peers.last().is_some_and(|last| last.is_empty()) {
        peers.pop();
    }
    peers
}
