//! Concurrency tests for the policy store

mod common;

use std::sync::Arc;

use tokio::sync::Barrier;
use tokio_test::{assert_pending, assert_ready_ok};

use common::FlakyStorage;
use transit_core::{KeyType, Storage};
use transit_keys::{Policy, PolicyRequest, PolicyStore};

fn request(name: &str) -> PolicyRequest {
    PolicyRequest::new(name, KeyType::Ed25519)
        .with_derived(true)
        .with_exportable(false)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_racing_creators_create_exactly_once() {
    const CALLERS: usize = 64;

    let storage = Arc::new(FlakyStorage::new());
    let store = Arc::new(PolicyStore::new(storage.clone()));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let store = store.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                let (policy, created) = store.create_or_get(&request("race-key")).await.unwrap();
                let entry = policy.latest_entry().unwrap();
                let public_key = entry.public_key().unwrap().to_string();
                (created, public_key)
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    let created = results.iter().filter(|(created, _)| *created).count();
    assert_eq!(created, 1);

    // Every caller saw the single created policy
    let first = &results[0].1;
    assert!(results.iter().all(|(_, key)| key == first));
    assert_eq!(storage.puts(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_names_are_independent() {
    const NAMES: usize = 16;
    const CALLERS_PER_NAME: usize = 4;

    let storage = Arc::new(FlakyStorage::new());
    let store = Arc::new(PolicyStore::new(storage.clone()));

    let mut handles = Vec::new();
    for i in 0..NAMES {
        for _ in 0..CALLERS_PER_NAME {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("key-{i}");
                let (_, created) = store
                    .create_or_get(&PolicyRequest::new(name, KeyType::Aes256Gcm96))
                    .await
                    .unwrap();
                created
            }));
        }
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap() {
            created += 1;
        }
    }

    assert_eq!(created, NAMES);
    assert_eq!(storage.puts(), NAMES);
    assert_eq!(store.list_names().await.unwrap().len(), NAMES);
}

#[tokio::test]
async fn test_readers_share_access() {
    let store = PolicyStore::new(Arc::new(FlakyStorage::new()));
    store.create_or_get(&request("shared")).await.unwrap();

    let first = store.get_shared("shared").await.unwrap().unwrap();
    let second = store.get_shared("shared").await.unwrap().unwrap();
    let (third, created) = store.create_or_get(&request("shared")).await.unwrap();

    assert!(!created);
    assert_eq!(first.latest_version(), second.latest_version());
    assert_eq!(second.name(), third.name());
}

#[tokio::test]
async fn test_delete_waits_for_readers() {
    let storage = Arc::new(FlakyStorage::new());
    let store = PolicyStore::new(storage.clone());
    store.create_or_get(&request("busy")).await.unwrap();

    let reader = store.get_shared("busy").await.unwrap().unwrap();

    let mut delete = tokio_test::task::spawn(store.delete("busy"));
    assert_pending!(delete.poll());
    assert_eq!(storage.deletes(), 0);

    drop(reader);
    assert!(delete.is_woken());
    assert_ready_ok!(delete.poll());
    drop(delete);

    assert_eq!(storage.deletes(), 1);
    assert!(store.get_shared("busy").await.unwrap().is_none());
}

#[tokio::test]
async fn test_readers_wait_for_creation() {
    let storage = Arc::new(FlakyStorage::new());
    let store = Arc::new(PolicyStore::new(storage.clone()));
    storage.hold_puts(true);

    // The creator parks inside its storage write, holding the write lock
    let creator = {
        let store = store.clone();
        tokio::spawn(async move {
            let (_, created) = store.create_or_get(&request("gated")).await.unwrap();
            created
        })
    };
    storage.wait_for_held_put().await;

    let mut reader = tokio_test::task::spawn(store.get_shared("gated"));
    assert_pending!(reader.poll());
    assert_eq!(storage.puts(), 0);

    storage.release_put();
    assert!(creator.await.unwrap());

    assert!(reader.is_woken());
    let policy = assert_ready_ok!(reader.poll()).unwrap();
    assert_eq!(policy.latest_version(), 1);
    assert!(policy.derived());
    drop(policy);
    drop(reader);

    assert_eq!(storage.puts(), 1);
}

#[tokio::test]
async fn test_rotate_waits_for_readers() {
    let store = PolicyStore::new(Arc::new(FlakyStorage::new()));
    store.create_or_get(&request("busy")).await.unwrap();

    let reader = store.get_shared("busy").await.unwrap().unwrap();

    let mut rotate = tokio_test::task::spawn(store.rotate("busy"));
    assert_pending!(rotate.poll());

    // The view is stable while held
    assert_eq!(reader.latest_version(), 1);
    drop(reader);
    drop(rotate);

    assert_eq!(store.rotate("busy").await.unwrap(), Some(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_create_delete_churn_keeps_cache_consistent() {
    const ROUNDS: usize = 32;

    let storage = Arc::new(FlakyStorage::new());
    let store = Arc::new(PolicyStore::new(storage.clone()));

    let mut handles = Vec::new();
    for round in 0..ROUNDS {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            if round % 3 == 0 {
                store.delete("churn").await.unwrap();
            } else if round % 3 == 1 {
                store
                    .create_or_get(&PolicyRequest::new("churn", KeyType::Aes256Gcm96))
                    .await
                    .unwrap();
            } else {
                let _ = store.get_shared("churn").await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Whatever the interleaving, the cache agrees with storage
    let stored = storage
        .get(&Policy::storage_key("churn"))
        .await
        .unwrap()
        .map(|bytes| Policy::from_bytes(&bytes).unwrap());
    let cached = store.get_shared("churn").await.unwrap();

    match (stored, cached) {
        (Some(stored), Some(cached)) => {
            assert_eq!(
                stored.latest_entry().unwrap().key(),
                cached.latest_entry().unwrap().key()
            );
        }
        (None, None) => {}
        (stored, cached) => panic!(
            "cache and storage diverged: stored={} cached={}",
            stored.is_some(),
            cached.is_some()
        ),
    }
}
