// Bincode helpers used to build stable hash preimages
use crate::error::{NodeError, Result};
use serde::Serialize;

/// Serialize data using bincode 2.0 with standard configuration
pub fn serialize<T: Serialize + bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| NodeError::Serialization(format!("Serialization failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, bincode::Encode)]
    struct TestData {
        id: u64,
        name: String,
        values: Vec<i32>,
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let data = TestData {
            id: 42,
            name: "test".to_string(),
            values: vec![1, 2, 3, 4, 5],
        };

        let first = serialize(&data).expect("Serialization should work");
        let second = serialize(&data.clone()).expect("Serialization should work");
        assert_eq!(first, second);
    }

    #[test]
    fn test_serialize_distinguishes_fields() {
        let a = TestData {
            id: 1,
            name: "a".to_string(),
            values: vec![],
        };
        let b = TestData { id: 2, ..a.clone() };

        assert_ne!(serialize(&a).unwrap(), serialize(&b).unwrap());
    }
}
