// src/store/tests/memory_tests.rs

use futures::future::join_all;
use std::sync::Arc;

use crate::store::{MemoryLogStore, RequestLogStore};

const T0: i64 = 1_700_000_000_000;

#[tokio::test]
async fn query_range_is_ascending_and_inclusive() {
    let store = MemoryLogStore::new();

    // Insert out of arrival order
    store.insert("k", T0 + 200, 1.0).await.unwrap();
    store.insert("k", T0, 1.0).await.unwrap();
    store.insert("k", T0 + 100, 2.0).await.unwrap();

    let entries = store.query_range("k", T0 + 100).await.unwrap();
    assert_eq!(entries.len(), 2, "from-bound is inclusive");
    assert_eq!(entries[0].timestamp, T0 + 100);
    assert_eq!(entries[0].weight, 2.0);
    assert_eq!(entries[1].timestamp, T0 + 200);
}

#[tokio::test]
async fn query_on_unknown_key_is_empty() {
    let store = MemoryLogStore::new();
    let entries = store.query_range("nobody", 0).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn delete_older_than_prunes_across_keys() {
    let store = MemoryLogStore::new();

    store.insert("a", T0, 1.0).await.unwrap();
    store.insert("a", T0 + 1_000, 1.0).await.unwrap();
    store.insert("b", T0, 1.0).await.unwrap();

    let removed = store.delete_older_than(T0 + 500).await.unwrap();
    assert_eq!(removed, 2);

    assert_eq!(store.len("a"), 1);
    assert_eq!(store.len("b"), 0);

    // Idempotent once everything old is gone
    let removed = store.delete_older_than(T0 + 500).await.unwrap();
    assert_eq!(removed, 0);
}

#[tokio::test]
async fn delete_by_key_leaves_other_keys_alone() {
    let store = MemoryLogStore::new();

    store.insert("a", T0, 1.0).await.unwrap();
    store.insert("a", T0 + 1, 1.0).await.unwrap();
    store.insert("b", T0, 1.0).await.unwrap();

    let removed = store.delete_by_key("a").await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(store.len("a"), 0);
    assert_eq!(store.len("b"), 1);

    let removed = store.delete_by_key("a").await.unwrap();
    assert_eq!(removed, 0, "second delete is a no-op");
}

#[tokio::test]
async fn concurrent_inserts_are_all_recorded() {
    let store = Arc::new(MemoryLogStore::new());

    let mut handles = Vec::new();
    for i in 0..50 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.insert("shared", T0 + i, 1.0).await.unwrap();
        }));
    }
    join_all(handles).await;

    assert_eq!(store.len("shared"), 50);
    let entries = store.query_range("shared", 0).await.unwrap();
    assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}
