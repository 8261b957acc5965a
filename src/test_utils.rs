// src/test_utils.rs

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::clock::Clock;
use crate::error::{RateLimiterError, Result, StorageError};
use crate::store::{LogEntry, MemoryLogStore, RequestLogStore};

/// Manually advanced clock for deterministic strategy tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<i64>>,
}

impl ManualClock {
    /// Starts at an arbitrary but non-zero epoch so timestamp math is
    /// exercised with realistic values.
    pub fn new() -> Self {
        Self::starting_at(1_700_000_000_000)
    }

    pub fn starting_at(millis: i64) -> Self {
        Self {
            now: Arc::new(Mutex::new(millis)),
        }
    }

    pub fn advance_millis(&self, millis: i64) {
        let mut now = self.now.lock().unwrap();
        *now += millis;
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_millis(secs * 1000);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        *self.now.lock().unwrap()
    }
}

/// Request log store whose failures can be switched on and off, for
/// fail-open and circuit breaker tests. Delegates to a memory store while
/// healthy.
#[derive(Debug, Clone, Default)]
pub struct FlakyLogStore {
    inner: MemoryLogStore,
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl FlakyLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of store operations attempted, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn entry_count(&self, key: &str) -> usize {
        self.inner.len(key)
    }

    fn check(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(RateLimiterError::Storage(StorageError::RedisConnection(
                "simulated store outage".to_string(),
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RequestLogStore for FlakyLogStore {
    async fn insert(&self, key: &str, timestamp: i64, weight: f64) -> Result<()> {
        self.check()?;
        self.inner.insert(key, timestamp, weight).await
    }

    async fn query_range(&self, key: &str, from: i64) -> Result<Vec<LogEntry>> {
        self.check()?;
        self.inner.query_range(key, from).await
    }

    async fn delete_older_than(&self, cutoff: i64) -> Result<u64> {
        self.check()?;
        self.inner.delete_older_than(cutoff).await
    }

    async fn delete_by_key(&self, key: &str) -> Result<u64> {
        self.check()?;
        self.inner.delete_by_key(key).await
    }
}
