//! Core traits for Transit
//!
//! - [`Storage`]: The durable storage collaborator

use async_trait::async_trait;

use crate::error::StorageError;

/// Durable key/value storage for serialized policies
///
/// Keys are `/`-separated paths such as `policy/orders-key`. Values are opaque
/// byte blobs; the storage layer never interprets them.
///
/// Implementations must be safe to share between tasks. The policy store
/// treats storage as the source of truth across restarts and instances.
#[async_trait]
pub trait Storage: Send + Sync {
    /// List the keys directly under `prefix`, with the prefix stripped
    ///
    /// The returned order must be stable for a given storage state.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Fetch the value stored under `key`, or `None` if absent
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`, replacing any existing value
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
