//! Loopback test harness
//!
//! Helpers that spin up a relay server on an ephemeral port and drive it with
//! bare protocol peers.

pub mod test_utils;

pub use test_utils::*;
