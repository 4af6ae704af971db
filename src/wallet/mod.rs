//! Key management
//!
//! This module generates the per-client secp256r1 key pair, stores it as PEM
//! files and derives the short RIPEMD-160 addresses used to tag outputs.

pub mod key_manager;

pub use key_manager::{derive_address, KeyManager, KeyPair, PRIVATE_KEYS_DIR, PUBLIC_KEYS_DIR};
