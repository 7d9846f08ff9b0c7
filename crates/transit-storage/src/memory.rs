//! In-memory storage implementation
//!
//! Suitable for testing and for deployments that do not need policies to
//! outlive the process.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use transit_core::{Storage, StorageError};

/// In-memory implementation of [`Storage`]
///
/// Uses `DashMap` for concurrent access to stored values.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    entries: DashMap<String, Vec<u8>>,
}

impl InMemoryStorage {
    /// Create a new, empty in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        // Children of `prefix`; deeper keys collapse into a "dir/" entry
        let children: BTreeSet<String> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let rest = entry.key().strip_prefix(prefix)?;
                match rest.find('/') {
                    Some(idx) => Some(rest[..=idx].to_string()),
                    None => Some(rest.to_string()),
                }
            })
            .filter(|child| !child.is_empty())
            .collect();

        Ok(children.into_iter().collect())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.get(key).map(|value| value.clone()))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        trace!(key, len = value.len(), "Storing value");
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            trace!(key, "Deleted value");
        }
        Ok(())
    }
}
