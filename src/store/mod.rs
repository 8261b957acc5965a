// src/store/mod.rs

pub mod memory;
pub mod redis;

#[cfg(test)]
mod tests;

pub use memory::MemoryLogStore;
pub use redis::RedisLogStore;

use super::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A single durable request record for the sliding-window strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the request arrived, unix epoch milliseconds
    pub timestamp: i64,

    /// Request weight; 1.0 for ordinary requests, more for expensive ones
    pub weight: f64,
}

/// Durable, queryable store of `(key, timestamp, weight)` tuples.
///
/// The sliding-window strategy reconstructs its history from this store, so
/// it survives process restarts and is shared across service instances. The
/// store must tolerate concurrent writers; rows are append-only and
/// garbage-collected by the facade's cleanup task.
#[async_trait]
pub trait RequestLogStore: Send + Sync + Debug {
    /// Appends one request record for `key`.
    async fn insert(&self, key: &str, timestamp: i64, weight: f64) -> Result<()>;

    /// Returns all records for `key` with `timestamp >= from`, ascending.
    async fn query_range(&self, key: &str, from: i64) -> Result<Vec<LogEntry>>;

    /// Deletes records older than `cutoff` across all keys. Returns the
    /// number of rows removed.
    async fn delete_older_than(&self, cutoff: i64) -> Result<u64>;

    /// Deletes every record for `key`. Returns the number of rows removed.
    async fn delete_by_key(&self, key: &str) -> Result<u64>;
}
