//! # Toycoin Node - Relay Server and Client for My Toy Coin
//!
//! A tiny star-shaped network for a toy cryptocurrency. When I come back to
//! this code, here's what I need to remember:
//!
//! ## What I Built
//! - **Relay Server**: accepts clients, keeps the peer list, fans every message out
//! - **Client**: sender loop for typed commands, receiver loop for inbound messages
//! - **Wire Protocol**: tag byte + UTF-8 payload inside a length-prefixed frame
//! - **Key Management**: secp256r1 key pair per client, PEM files, RIPEMD-160 addresses
//! - **Miner**: cancellable proof-of-work over leading zero hex digits
//!
//! ## How I Organized My Code
//! - `network/`: protocol, peer registry, server and client
//! - `core/`: transactions, blocks, the local chain and the miner
//! - `wallet/`: key generation, key files and addresses
//! - `config/`: environment-driven settings
//! - `utils/`: digests, PEM encoding, bincode helper
//! - `cli/`: the `startserver` / `startclient` commands
//!
//! ## Things That Are Deliberately Missing
//! - No chain validation or fork resolution, blocks are appended as they come
//! - No persistence apart from the key files
//! - No peer authentication, anyone who connects is a peer

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{Config, GLOBAL_CONFIG};
pub use crate::core::{meets_difficulty, Block, Blockchain, Miner, Transaction};
pub use error::{NodeError, Result};
pub use network::{Client, ClientCommand, ClientState, Message, MessageTag, PeerRegistry, Server};
pub use wallet::{derive_address, KeyManager, KeyPair};
