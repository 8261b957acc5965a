// src/strategy/tests/sliding_window_tests.rs

use super::test_config;
use crate::store::{MemoryLogStore, RequestLogStore};
use crate::strategy::sliding_window;

const T0: i64 = 1_700_000_000_000;

#[tokio::test]
async fn admits_until_weighted_count_reaches_limit() {
    let store = MemoryLogStore::new();
    let config = test_config(5, 1_000);

    // Back-to-back requests carry full weight, so exactly max_requests
    // admissions fit at a single instant
    for i in 0..5 {
        let decision = sliding_window::check(&store, "k", &config, T0).await.unwrap();
        assert!(decision.allowed, "request {} admitted", i);
    }

    let decision = sliding_window::check(&store, "k", &config, T0).await.unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.remaining, 0);
    // Oldest entry is brand new: the full window must pass
    assert_eq!(decision.retry_after, Some(1));
}

#[tokio::test]
async fn denied_requests_are_not_logged() {
    let store = MemoryLogStore::new();
    let config = test_config(2, 1_000);

    sliding_window::check(&store, "k", &config, T0).await.unwrap();
    sliding_window::check(&store, "k", &config, T0).await.unwrap();
    assert_eq!(store.len("k"), 2);

    let decision = sliding_window::check(&store, "k", &config, T0).await.unwrap();
    assert!(!decision.allowed);
    assert_eq!(store.len("k"), 2, "denied request must not append a log entry");
}

/// Weight decays linearly with age, so a saturated window smoothly regains
/// capacity instead of jumping open at a boundary: half a window after a
/// full burst, half the budget is already back.
#[tokio::test]
async fn capacity_returns_gradually_as_entries_age() {
    let store = MemoryLogStore::new();
    let config = test_config(4, 1_000);

    for _ in 0..4 {
        sliding_window::check(&store, "k", &config, T0).await.unwrap();
    }
    assert!(!sliding_window::check(&store, "k", &config, T0).await.unwrap().allowed);

    // Half a window later the 4 entries weigh 2.0 in total
    let decision = sliding_window::check(&store, "k", &config, T0 + 500)
        .await
        .unwrap();
    assert!(decision.allowed);
    // ceil(2.0) consumed + the request just logged
    assert_eq!(decision.remaining, 1);
}

#[tokio::test]
async fn full_window_wait_restores_full_allowance() {
    let store = MemoryLogStore::new();
    let config = test_config(3, 1_000);

    for _ in 0..3 {
        sliding_window::check(&store, "k", &config, T0).await.unwrap();
    }

    // windowMs after the first request, everything has aged out
    let decision = sliding_window::check(&store, "k", &config, T0 + 1_000)
        .await
        .unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.remaining, 2);
}

#[tokio::test]
async fn retry_after_tracks_oldest_entry() {
    let store = MemoryLogStore::new();
    let config = test_config(3, 10_000);

    // One aged entry plus three fresh ones push the weighted count past 3
    store.insert("k", T0, 1.0).await.unwrap();
    for _ in 0..3 {
        store.insert("k", T0 + 1_000, 1.0).await.unwrap();
    }

    let decision = sliding_window::check(&store, "k", &config, T0 + 1_000)
        .await
        .unwrap();
    assert!(!decision.allowed);
    // The oldest entry clears 9s from now
    assert_eq!(decision.retry_after, Some(9));
}

#[tokio::test]
async fn weighted_entries_count_proportionally() {
    let store = MemoryLogStore::new();
    let config = test_config(4, 1_000);

    // A weight-3 entry consumes three slots at full freshness
    store.insert("k", T0, 3.0).await.unwrap();

    let decision = sliding_window::check(&store, "k", &config, T0).await.unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.remaining, 0);

    let decision = sliding_window::check(&store, "k", &config, T0).await.unwrap();
    assert!(!decision.allowed);
}

#[tokio::test]
async fn keys_are_isolated() {
    let store = MemoryLogStore::new();
    let config = test_config(1, 1_000);

    assert!(sliding_window::check(&store, "alice", &config, T0).await.unwrap().allowed);
    assert!(!sliding_window::check(&store, "alice", &config, T0).await.unwrap().allowed);

    // A different key has its own window
    assert!(sliding_window::check(&store, "bob", &config, T0).await.unwrap().allowed);
}
