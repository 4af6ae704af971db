//! Error handling for the relay node
//!
//! This module provides the error type shared by the protocol, the server,
//! the client, the key manager and the miner.

use std::fmt;

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, NodeError>;

/// Error types for node operations
#[derive(Debug, Clone)]
pub enum NodeError {
    /// Socket level errors (connect, bind, accept, reset)
    Network(String),
    /// Undecodable or oversized protocol frames
    Protocol(String),
    /// Key generation and key encoding errors
    Crypto(String),
    /// File I/O errors
    Io(String),
    /// Proof-of-work errors, including cancellation
    Mining(String),
    /// Malformed user commands
    Command(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Network(msg) => write!(f, "Network error: {msg}"),
            NodeError::Protocol(msg) => write!(f, "Protocol error: {msg}"),
            NodeError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            NodeError::Io(msg) => write!(f, "I/O error: {msg}"),
            NodeError::Mining(msg) => write!(f, "Mining error: {msg}"),
            NodeError::Command(msg) => write!(f, "Command error: {msg}"),
            NodeError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            NodeError::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for NodeError {}

impl From<std::io::Error> for NodeError {
    fn from(err: std::io::Error) -> Self {
        NodeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(err: serde_json::Error) -> Self {
        NodeError::Serialization(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for NodeError {
    fn from(err: bincode::error::EncodeError) -> Self {
        NodeError::Serialization(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for NodeError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        NodeError::Protocol(format!("Invalid UTF-8 payload: {err}"))
    }
}
