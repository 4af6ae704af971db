use crate::core::{zero_hash, Block};
use crate::error::Result;
use log::info;

/// In-memory chain kept by each client
///
/// Blocks are appended as they are mined locally or received from the relay.
/// Nothing is validated and nothing is persisted.
#[derive(Debug, Clone, Default)]
pub struct Blockchain {
    blocks: Vec<Block>,
    difficulty: usize,
}

impl Blockchain {
    pub fn new(difficulty: usize) -> Blockchain {
        Blockchain {
            blocks: vec![],
            difficulty,
        }
    }

    pub fn get_blocks(&self) -> &[Block] {
        self.blocks.as_slice()
    }

    pub fn get_difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn set_difficulty(&mut self, difficulty: usize) {
        info!("Mining difficulty {} -> {difficulty}", self.difficulty);
        self.difficulty = difficulty;
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Hash the next block must point at
    pub fn last_hash(&self) -> Result<String> {
        match self.blocks.last() {
            Some(block) => block.hash(),
            None => Ok(zero_hash()),
        }
    }

    /// True if a block with this hash is already in the chain
    pub fn contains(&self, hash: &str) -> Result<bool> {
        for block in &self.blocks {
            if block.hash()? == hash {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn add_block(&mut self, block: Block) -> Result<()> {
        info!(
            "Appending block {} at height {}",
            block.hash()?,
            self.blocks.len()
        );
        self.blocks.push(block);
        Ok(())
    }
}
