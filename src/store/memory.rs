// src/store/memory.rs

// In-memory request log (for testing and single-instance deployments)
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::Result;
use crate::store::{LogEntry, RequestLogStore};

/// In-memory request log store.
///
/// Keeps every key's records in arrival order. Single-instance only: unlike
/// the Redis store it provides no cross-instance view, so sliding-window
/// limits enforced through it are per-process.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogStore {
    data: Arc<RwLock<HashMap<String, Vec<LogEntry>>>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held for `key`, for tests and diagnostics.
    pub fn len(&self, key: &str) -> usize {
        let data = self.data.read().unwrap();
        data.get(key).map_or(0, |entries| entries.len())
    }
}

#[async_trait]
impl RequestLogStore for MemoryLogStore {
    async fn insert(&self, key: &str, timestamp: i64, weight: f64) -> Result<()> {
        let mut data = self.data.write().unwrap();
        let entries = data.entry(key.to_string()).or_default();
        entries.push(LogEntry { timestamp, weight });
        Ok(())
    }

    async fn query_range(&self, key: &str, from: i64) -> Result<Vec<LogEntry>> {
        let data = self.data.read().unwrap();
        let mut matches: Vec<LogEntry> = data
            .get(key)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.timestamp >= from)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();

        // Inserts arrive in near-arrival order; sort to guarantee ascending
        matches.sort_by_key(|entry| entry.timestamp);
        Ok(matches)
    }

    async fn delete_older_than(&self, cutoff: i64) -> Result<u64> {
        let mut data = self.data.write().unwrap();
        let mut removed = 0u64;

        for entries in data.values_mut() {
            let before = entries.len();
            entries.retain(|entry| entry.timestamp >= cutoff);
            removed += (before - entries.len()) as u64;
        }

        // Drop keys whose history is fully expired
        data.retain(|_, entries| !entries.is_empty());
        Ok(removed)
    }

    async fn delete_by_key(&self, key: &str) -> Result<u64> {
        let mut data = self.data.write().unwrap();
        Ok(data.remove(key).map_or(0, |entries| entries.len() as u64))
    }
}
