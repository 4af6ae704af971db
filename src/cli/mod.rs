//! Command-line interface
//!
//! This module contains the process-level commands: run the relay server or
//! run a client against it.

pub mod commands;

pub use commands::{Command, Opt};
