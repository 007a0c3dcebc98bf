//! Model cache
//!
//! A write-buffering view over the base store. Contract reads are served
//! from pending writes first and then from the store; every read is
//! recorded with the version it observed. Nothing is written back until
//! the caller commits the output set.

use crate::core::{TxInput, TxOutput, UtxoOutput};
use crate::crypto::sha256_hex;
use crate::storage::{KvStore, StorageError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Separator between a bucket and a key in the base store
const BUCKET_SEPARATOR: u8 = b'/';

/// Base-store key for `key` inside `bucket`
pub fn bucket_key(bucket: &str, key: &[u8]) -> Vec<u8> {
    let mut full = Vec::with_capacity(bucket.len() + 1 + key.len());
    full.extend_from_slice(bucket.as_bytes());
    full.push(BUCKET_SEPARATOR);
    full.extend_from_slice(key);
    full
}

/// Pending reads, writes and transfers of one execution
pub struct ModelCache {
    store: Arc<dyn KvStore>,
    reads: BTreeMap<(String, Vec<u8>), String>,
    writes: BTreeMap<(String, Vec<u8>), Vec<u8>>,
    transfers: Vec<UtxoOutput>,
}

impl ModelCache {
    /// Create an empty cache over `store`
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
            transfers: Vec::new(),
        }
    }

    /// Read `key` from `bucket`
    pub fn get(&mut self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let id = (bucket.to_string(), key.to_vec());
        if let Some(value) = self.writes.get(&id) {
            return Ok(Some(value.clone()));
        }

        let value = self.store.get(&bucket_key(bucket, key))?;
        self.record_read(id, value.as_deref());
        Ok(value)
    }

    /// Buffer a write of `key` in `bucket`
    pub fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) {
        self.writes
            .insert((bucket.to_string(), key.to_vec()), value.to_vec());
    }

    /// Every entry in `bucket` whose key starts with `prefix`, with pending
    /// writes applied. Keys are returned without the bucket.
    pub fn scan_prefix(
        &mut self,
        bucket: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let bucket_prefix = bucket_key(bucket, b"");
        let mut merged = BTreeMap::new();

        for (full_key, value) in self.store.scan_prefix(&bucket_key(bucket, prefix))? {
            let key = full_key[bucket_prefix.len()..].to_vec();
            self.record_read((bucket.to_string(), key.clone()), Some(&value));
            merged.insert(key, value);
        }

        for ((write_bucket, key), value) in &self.writes {
            if write_bucket == bucket && key.starts_with(prefix) {
                merged.insert(key.clone(), value.clone());
            }
        }

        Ok(merged.into_iter().collect())
    }

    /// Record a value transfer
    pub fn transfer(&mut self, from: &str, to: &str, amount: &str) {
        self.transfers.push(UtxoOutput {
            from: from.to_string(),
            to: to.to_string(),
            amount: amount.to_string(),
        });
    }

    /// Read and write sets, in key order
    pub fn rw_sets(&self) -> (Vec<TxInput>, Vec<TxOutput>) {
        let inputs = self
            .reads
            .iter()
            .map(|((bucket, key), version)| TxInput {
                bucket: bucket.clone(),
                key: key.clone(),
                version: version.clone(),
            })
            .collect();
        let outputs = self
            .writes
            .iter()
            .map(|((bucket, key), value)| TxOutput {
                bucket: bucket.clone(),
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        (inputs, outputs)
    }

    /// Value transfers, in the order they were requested
    pub fn utxo_outputs(&self) -> Vec<UtxoOutput> {
        self.transfers.clone()
    }

    /// True if nothing was written or transferred
    pub fn is_clean(&self) -> bool {
        self.writes.is_empty() && self.transfers.is_empty()
    }

    fn record_read(&mut self, id: (String, Vec<u8>), value: Option<&[u8]>) {
        self.reads
            .entry(id)
            .or_insert_with(|| value.map(sha256_hex).unwrap_or_default());
    }
}

/// Apply a write set to the base store
pub fn commit_outputs(store: &dyn KvStore, outputs: &[TxOutput]) -> Result<(), StorageError> {
    let batch: Vec<(Vec<u8>, Vec<u8>)> = outputs
        .iter()
        .map(|o| (bucket_key(&o.bucket, &o.key), o.value.clone()))
        .collect();
    store.put_batch(&batch)
}
