//! Configuration management
//!
//! This module handles the settings shared by the server and the client:
//! where the relay listens, where key files live and how hard mining is.

pub mod settings;

pub use settings::{Config, DEFAULT_DIFFICULTY, DEFAULT_SERVER_PORT, GLOBAL_CONFIG};
