// Transactions carried between clients
// The relay does not validate them, it only moves their JSON text around

use crate::error::{NodeError, Result};
use serde::{Deserialize, Serialize};

/// Amount of the demonstration coin gift
pub const GIFT_VALUE: u64 = 100;

/// Placeholder hash used where no previous transaction or spender exists
pub fn zero_hash() -> String {
    "0".repeat(64)
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TransactionInput {
    prev_tx: String,    // Hash of the transaction being spent
    pk_spender: String, // Address of whoever spends it
    value: u64,
}

impl TransactionInput {
    pub fn new(prev_tx: String, pk_spender: String, value: u64) -> TransactionInput {
        TransactionInput {
            prev_tx,
            pk_spender,
            value,
        }
    }

    pub fn get_prev_tx(&self) -> &str {
        self.prev_tx.as_str()
    }

    pub fn get_pk_spender(&self) -> &str {
        self.pk_spender.as_str()
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TransactionOutput {
    value: u64,
    hash_pubkey_recipient: String, // Address that owns this output
}

impl TransactionOutput {
    pub fn new(value: u64, hash_pubkey_recipient: String) -> TransactionOutput {
        TransactionOutput {
            value,
            hash_pubkey_recipient,
        }
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_recipient(&self) -> &str {
        self.hash_pubkey_recipient.as_str()
    }

    pub fn is_owned_by(&self, address: &str) -> bool {
        self.hash_pubkey_recipient == address
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    input: TransactionInput,
    output: TransactionOutput,
}

impl Transaction {
    pub fn new(input: TransactionInput, output: TransactionOutput) -> Transaction {
        Transaction { input, output }
    }

    /// Build a transfer of `output_value` to `recipient`, funded by `input_value`
    pub fn new_transfer(
        spender: &str,
        input_value: u64,
        output_value: u64,
        recipient: &str,
    ) -> Result<Transaction> {
        if output_value > input_value {
            return Err(NodeError::Command(format!(
                "Output {output_value} exceeds input {input_value}"
            )));
        }
        let input = TransactionInput::new(zero_hash(), spender.to_string(), input_value);
        let output = TransactionOutput::new(output_value, recipient.to_string());
        Ok(Transaction::new(input, output))
    }

    /// Demonstration only: a coin that comes from nowhere, paid to `address`
    pub fn coin_gift(address: &str) -> Transaction {
        let input = TransactionInput::new(zero_hash(), zero_hash(), GIFT_VALUE);
        let output = TransactionOutput::new(GIFT_VALUE, address.to_string());
        Transaction::new(input, output)
    }

    pub fn get_input(&self) -> &TransactionInput {
        &self.input
    }

    pub fn get_output(&self) -> &TransactionOutput {
        &self.output
    }

    /// JSON text carried in a NewTransaction payload
    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn deserialize(text: &str) -> Result<Transaction> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_gift_pays_address() {
        let tx = Transaction::coin_gift("abcdef");

        assert!(tx.get_output().is_owned_by("abcdef"));
        assert_eq!(tx.get_output().get_value(), GIFT_VALUE);
        assert_eq!(tx.get_input().get_prev_tx(), zero_hash());
        assert_eq!(tx.get_input().get_pk_spender(), zero_hash());
    }

    #[test]
    fn test_transfer_rejects_output_above_input() {
        let result = Transaction::new_transfer("me", 10, 11, "you");
        assert!(matches!(result, Err(NodeError::Command(_))));

        let tx = Transaction::new_transfer("me", 10, 7, "you").unwrap();
        assert_eq!(tx.get_input().get_value(), 10);
        assert_eq!(tx.get_output().get_value(), 7);
        assert_eq!(tx.get_output().get_recipient(), "you");
    }

    #[test]
    fn test_serialized_text_is_json() {
        let tx = Transaction::coin_gift("abcdef");
        let text = tx.serialize().unwrap();

        assert!(text.contains("\"hash_pubkey_recipient\":\"abcdef\""));
        assert_eq!(Transaction::deserialize(&text).unwrap(), tx);
        assert!(Transaction::deserialize("{not json").is_err());
    }
}
