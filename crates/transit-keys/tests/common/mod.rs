//! Shared test doubles for transit-keys integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use transit_core::{Storage, StorageError};
use transit_storage::InMemoryStorage;

/// In-memory storage with switchable failures and write counters
#[derive(Default)]
pub struct FlakyStorage {
    inner: InMemoryStorage,
    fail_list: AtomicBool,
    fail_get: AtomicBool,
    fail_put: AtomicBool,
    fail_delete: AtomicBool,
    hold_puts: AtomicBool,
    put_held: Notify,
    put_released: Notify,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_put(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Park every put until [`release_put`](Self::release_put) is called
    pub fn hold_puts(&self, hold: bool) {
        self.hold_puts.store(hold, Ordering::SeqCst);
    }

    /// Wait until a put is parked
    pub async fn wait_for_held_put(&self) {
        self.put_held.notified().await;
    }

    /// Let one parked put continue
    pub fn release_put(&self) {
        self.put_released.notify_one();
    }

    /// Successful puts so far
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Successful deletes so far
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryStorage {
        &self.inner
    }
}

fn injected(op: &str) -> StorageError {
    StorageError::unavailable(format!("injected {} failure", op))
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(injected("list"));
        }
        self.inner.list(prefix).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(injected("get"));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(injected("put"));
        }
        if self.hold_puts.load(Ordering::SeqCst) {
            self.put_held.notify_one();
            self.put_released.notified().await;
        }
        self.inner.put(key, value).await?;
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(injected("delete"));
        }
        self.inner.delete(key).await?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
