//! Middleware registry
//!
//! The ordered list of contract names every intercepted call is routed
//! through. The list is persisted as a JSON array under a fixed key of the
//! base store after every change. A change only takes effect in memory
//! once it has been written.

use crate::middleware::error::{MiddlewareError, MiddlewareResult};
use crate::storage::KvStore;
use log::info;

/// Ordered, duplicate-free list of middleware contract names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareRegistry {
    names: Vec<String>,
    key: Vec<u8>,
}

impl MiddlewareRegistry {
    /// Load the registry persisted under `key`. If nothing is stored yet,
    /// start from `defaults` (not persisted until the first change).
    pub fn load(store: &dyn KvStore, key: &str, defaults: &[String]) -> MiddlewareResult<Self> {
        let names = match store.get(key.as_bytes())? {
            Some(data) => {
                let names: Vec<String> = serde_json::from_slice(&data)?;
                info!("Loaded middleware registry: {:?}", names);
                names
            }
            None => {
                info!("No middleware registry persisted, seeding {:?}", defaults);
                defaults.to_vec()
            }
        };

        Ok(Self {
            names,
            key: key.as_bytes().to_vec(),
        })
    }

    /// Registered names, in execution order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of registered middlewares
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Serialized list, e.g. `["audit","text_filter"]`
    pub fn list(&self) -> String {
        encode(&self.names)
    }

    /// Register `name` at `index`.
    ///
    /// The index is checked against the list with `name` appended, so
    /// `index == len()` appends at the end.
    pub fn insert(&mut self, store: &dyn KvStore, name: &str, index: &str) -> MiddlewareResult<String> {
        if name.is_empty() {
            return Err(MiddlewareError::EmptyName);
        }
        if let Some(existing) = self.position(name) {
            return Err(MiddlewareError::AlreadyExists {
                name: name.to_string(),
                index: existing,
            });
        }

        let mut updated = self.names.clone();
        updated.push(name.to_string());
        let updated = reordered(updated, name, index)?;
        self.commit(store, updated)?;

        info!("Middleware {} inserted, registry: {}", name, self.list());
        Ok(self.list())
    }

    /// Move `name` to `index`
    pub fn reorder(&mut self, store: &dyn KvStore, name: &str, index: &str) -> MiddlewareResult<String> {
        let updated = reordered(self.names.clone(), name, index)?;
        self.commit(store, updated)?;

        info!("Middleware {} moved to {}, registry: {}", name, index, self.list());
        Ok(self.list())
    }

    /// Unregister `name`
    pub fn remove(&mut self, store: &dyn KvStore, name: &str) -> MiddlewareResult<String> {
        if name.is_empty() {
            return Err(MiddlewareError::EmptyName);
        }
        let position = self
            .position(name)
            .ok_or_else(|| MiddlewareError::NotFound(name.to_string()))?;

        let mut updated = self.names.clone();
        updated.remove(position);
        self.commit(store, updated)?;

        info!("Middleware {} removed, registry: {}", name, self.list());
        Ok(self.list())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Persist `names`, then adopt them
    fn commit(&mut self, store: &dyn KvStore, names: Vec<String>) -> MiddlewareResult<()> {
        store.put(&self.key, encode(&names).as_bytes())?;
        self.names = names;
        Ok(())
    }
}

fn encode(names: &[String]) -> String {
    // A list of strings always serializes
    serde_json::to_string(names).unwrap_or_else(|_| "[]".to_string())
}

/// Parse a registry index. An empty index means the front.
fn parse_index(index: &str) -> MiddlewareResult<usize> {
    let index = if index.is_empty() { "0" } else { index };
    index
        .parse::<usize>()
        .map_err(|_| MiddlewareError::InvalidIndex(index.to_string()))
}

/// Move `name` within `names` so that it ends up at `index`.
///
/// The index is bounds-checked against `names` as given, before `name` is
/// taken out. After removal the list is one shorter, so any in-bounds
/// index is still a valid insertion point.
fn reordered(mut names: Vec<String>, name: &str, index: &str) -> MiddlewareResult<Vec<String>> {
    if name.is_empty() {
        return Err(MiddlewareError::EmptyName);
    }
    let target = parse_index(index)?;
    if target >= names.len() {
        return Err(MiddlewareError::InvalidIndex(index.to_string()));
    }
    let position = names
        .iter()
        .position(|n| n == name)
        .ok_or_else(|| MiddlewareError::NotFound(name.to_string()))?;

    let moved = names.remove(position);
    names.insert(target, moved);
    Ok(names)
}
