use crate::core::Transaction;
use crate::error::Result;
use crate::utils::{serialize, sha256_digest};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Block {
    transactions: Vec<Transaction>,
    nonce: u64,
    prev_block_hash: String,
}

impl Block {
    pub fn new(transactions: Vec<Transaction>, nonce: u64, prev_block_hash: String) -> Block {
        Block {
            transactions,
            nonce,
            prev_block_hash,
        }
    }

    /// Lowercase hex SHA-256 of the block's bincode encoding
    pub fn hash(&self) -> Result<String> {
        let data = serialize(self)?;
        Ok(HEXLOWER.encode(&sha256_digest(&data)))
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_prev_block_hash(&self) -> &str {
        self.prev_block_hash.as_str()
    }

    /// JSON text carried in a NewBlock payload
    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn deserialize(text: &str) -> Result<Block> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::zero_hash;

    fn gift_block(nonce: u64) -> Block {
        Block::new(vec![Transaction::coin_gift("abc")], nonce, zero_hash())
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = gift_block(0).hash().unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn test_hash_depends_on_nonce_and_prev_hash() {
        let base = gift_block(0);
        assert_eq!(base.hash().unwrap(), gift_block(0).hash().unwrap());
        assert_ne!(base.hash().unwrap(), gift_block(1).hash().unwrap());

        let other_parent = Block::new(base.get_transactions().to_vec(), 0, "f".repeat(64));
        assert_ne!(base.hash().unwrap(), other_parent.hash().unwrap());
    }

    #[test]
    fn test_wire_text_preserves_block() {
        let block = gift_block(42);
        let text = block.serialize().unwrap();
        let decoded = Block::deserialize(&text).unwrap();

        assert_eq!(decoded.get_nonce(), 42);
        assert_eq!(decoded.hash().unwrap(), block.hash().unwrap());
    }
}
