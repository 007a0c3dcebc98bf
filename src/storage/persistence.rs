//! File-backed base store
//!
//! Keeps the store in memory and rewrites a JSON file on every write.
//! Writes go to a temporary file first and are renamed into place.

use crate::storage::kv::KvStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub state_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".middle_data"),
            state_file: "state.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Store persisted as hex-encoded JSON in `data_dir`
pub struct FileStore {
    config: StorageConfig,
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl FileStore {
    /// Open the store, loading any existing state file
    pub fn open(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        let path = config.data_dir.join(&config.state_file);
        let entries = if path.exists() {
            Self::read_file(&path)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            config,
            entries: RwLock::new(entries),
        })
    }

    fn state_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.state_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.state_file, index))
    }

    fn read_file(path: &std::path::Path) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, StorageError> {
        let file = fs::File::open(path)?;
        let encoded: BTreeMap<String, String> = serde_json::from_reader(BufReader::new(file))?;

        let mut entries = BTreeMap::new();
        for (key, value) in encoded {
            let key = hex::decode(&key)
                .map_err(|_| StorageError::InvalidData(format!("bad key encoding: {}", key)))?;
            let value = hex::decode(&value)
                .map_err(|_| StorageError::InvalidData(format!("bad value encoding: {}", value)))?;
            entries.insert(key, value);
        }
        Ok(entries)
    }

    /// Write `entries` to disk
    fn flush(&self, entries: &BTreeMap<Vec<u8>, Vec<u8>>) -> Result<(), StorageError> {
        let path = self.state_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        let encoded: BTreeMap<String, String> = entries
            .iter()
            .map(|(k, v)| (hex::encode(k), hex::encode(v)))
            .collect();

        let temp_path = self.config.data_dir.join("state.tmp");
        let file = fs::File::create(&temp_path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &encoded)?;

        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn rotate_backups(&self) -> Result<(), StorageError> {
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }
        Ok(())
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let path = self.state_path();
        let file_size = if path.exists() {
            fs::metadata(&path)?.len()
        } else {
            0
        };

        Ok(StorageStats {
            file_size,
            key_count: self.entries.read().len(),
            backup_count: self.list_backups().len(),
            data_dir: self.config.data_dir.clone(),
        })
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.put_batch(&[(key.to_vec(), value.to_vec())])
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn put_batch(&self, batch: &[(Vec<u8>, Vec<u8>)]) -> Result<(), StorageError> {
        let mut entries = self.entries.write();
        let mut updated = entries.clone();
        for (key, value) in batch {
            updated.insert(key.clone(), value.clone());
        }
        // Memory only changes once the file is safely on disk
        self.flush(&updated)?;
        *entries = updated;
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug)]
pub struct StorageStats {
    pub file_size: u64,
    pub key_count: usize,
    pub backup_count: usize,
    pub data_dir: PathBuf,
}
