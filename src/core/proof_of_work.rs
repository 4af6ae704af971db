use crate::core::{Block, Blockchain, Transaction};
use crate::error::{NodeError, Result};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};

/// How many nonces are tried between two looks at the cancel flag
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// True when `hash` starts with `difficulty` hex zero characters
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Brute-force proof-of-work over candidate blocks
pub struct Miner;

impl Miner {
    /// Search nonces 0, 1, 2, ... and return the first block whose hash meets
    /// `difficulty`. Blocks the calling thread until a nonce is found or
    /// `cancel` is raised.
    pub fn mine(
        transactions: &[Transaction],
        prev_block_hash: &str,
        difficulty: usize,
        cancel: &AtomicBool,
    ) -> Result<Block> {
        info!("Mining on top of {prev_block_hash} with difficulty {difficulty}");
        let mut nonce: u64 = 0;
        loop {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::SeqCst) {
                info!("Mining cancelled after {nonce} attempts");
                return Err(NodeError::Mining("cancelled".to_string()));
            }

            let block = Block::new(transactions.to_vec(), nonce, prev_block_hash.to_string());
            let hash = block.hash()?;
            if meets_difficulty(&hash, difficulty) {
                info!("Nonce {nonce} found, block hash {hash}");
                return Ok(block);
            }

            nonce = nonce
                .checked_add(1)
                .ok_or_else(|| NodeError::Mining("nonce space exhausted".to_string()))?;
            if nonce % 100_000 == 0 {
                debug!("Still mining, {nonce} nonces tried");
            }
        }
    }

    /// Mine `transactions` as the next block of `blockchain`
    pub fn mine_next(
        blockchain: &Blockchain,
        transactions: &[Transaction],
        cancel: &AtomicBool,
    ) -> Result<Block> {
        let prev_hash = blockchain.last_hash()?;
        Self::mine(
            transactions,
            &prev_hash,
            blockchain.get_difficulty(),
            cancel,
        )
    }

    /// Check a block's proof-of-work
    pub fn validate(block: &Block, difficulty: usize) -> Result<bool> {
        Ok(meets_difficulty(&block.hash()?, difficulty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::zero_hash;

    fn gift() -> Vec<Transaction> {
        vec![Transaction::coin_gift("0123456789abcdef0123456789abcdef01234567")]
    }

    #[test]
    fn test_meets_difficulty() {
        assert!(meets_difficulty("00ab", 0));
        assert!(meets_difficulty("00ab", 2));
        assert!(!meets_difficulty("00ab", 3));
        assert!(!meets_difficulty("0", 2));
    }

    #[test]
    fn test_difficulty_zero_accepts_first_nonce() {
        let cancel = AtomicBool::new(false);
        let block = Miner::mine(&gift(), &zero_hash(), 0, &cancel).unwrap();
        assert_eq!(block.get_nonce(), 0);
    }

    #[test]
    fn test_mined_nonce_is_minimal() {
        let cancel = AtomicBool::new(false);
        let difficulty = 2;
        let block = Miner::mine(&gift(), &zero_hash(), difficulty, &cancel).unwrap();

        assert!(Miner::validate(&block, difficulty).unwrap());
        for nonce in 0..block.get_nonce() {
            let candidate = Block::new(gift(), nonce, zero_hash());
            assert!(!meets_difficulty(&candidate.hash().unwrap(), difficulty));
        }
    }

    #[test]
    fn test_cancelled_mining_stops() {
        let cancel = AtomicBool::new(true);
        let result = Miner::mine(&gift(), &zero_hash(), 64, &cancel);
        assert!(matches!(result, Err(NodeError::Mining(_))));
    }

    #[test]
    fn test_mine_next_links_to_chain_tip() {
        let cancel = AtomicBool::new(false);
        let mut chain = Blockchain::new(1);

        let first = Miner::mine_next(&chain, &gift(), &cancel).unwrap();
        let first_hash = first.hash().unwrap();
        chain.add_block(first).unwrap();

        let second = Miner::mine_next(&chain, &gift(), &cancel).unwrap();
        assert_eq!(second.get_prev_block_hash(), first_hash);
        assert!(Miner::validate(&second, 1).unwrap());
    }
}
