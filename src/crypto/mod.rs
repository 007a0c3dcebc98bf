//! Cryptographic utilities
//!
//! SHA-256 hashing used for proposal identifiers and transaction ids.

pub mod hash;

pub use hash::{hash_json, sha256, sha256_hex};
