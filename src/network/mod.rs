//! Star-topology networking
//!
//! A relay server accepts clients, keeps the peer list and fans every message
//! out to all connected clients. Clients talk to the server only.

pub mod client;
pub mod message;
pub mod peers;
pub mod server;

pub use client::{Client, ClientCommand, ClientState};
pub use message::{read_message, write_message, Message, MessageTag};
pub use peers::PeerRegistry;
pub use server::Server;
