//! Hashing utilities
//!
//! Provides SHA-256 based hashing used to derive proposal identifiers
//! and refund transaction ids.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Hashes the canonical JSON encoding of a value.
///
/// Field order follows the struct declaration and maps must be ordered
/// (`BTreeMap`), so every node derives the same digest for the same value.
pub fn hash_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let encoded = serde_json::to_vec(value)?;
    Ok(sha256_hex(&encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_sha256() {
        let data = b"hello world";
        let hash = sha256(data);
        assert_eq!(hash.len(), 32);
        assert_eq!(
            sha256_hex(data),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_hash_json_is_order_independent_for_maps() {
        let mut a = BTreeMap::new();
        a.insert("b", 2);
        a.insert("a", 1);

        let mut b = BTreeMap::new();
        b.insert("a", 1);
        b.insert("b", 2);

        assert_eq!(hash_json(&a).unwrap(), hash_json(&b).unwrap());
        assert_ne!(hash_json(&a).unwrap(), hash_json(&vec![1, 2]).unwrap());
    }
}
