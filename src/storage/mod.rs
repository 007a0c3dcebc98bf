//! Storage module: the node's base key-value store

pub mod kv;
pub mod persistence;

pub use kv::{KvStore, MemoryStore};
pub use persistence::{FileStore, StorageConfig, StorageError, StorageStats};
