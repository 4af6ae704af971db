//! Core ledger and mining
//!
//! This module contains the small ledger model the network carries around
//! (transactions, blocks, the local chain) and the proof-of-work miner.

pub mod block;
pub mod blockchain;
pub mod proof_of_work;
pub mod transaction;

pub use block::Block;
pub use blockchain::Blockchain;
pub use proof_of_work::{meets_difficulty, Miner};
pub use transaction::{zero_hash, Transaction, TransactionInput, TransactionOutput, GIFT_VALUE};
