// src/store/redis.rs

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::RedisConfig;
use crate::error::{RateLimiterError, Result, StorageError};
use crate::store::{LogEntry, RequestLogStore};

/// Redis-backed request log store.
///
/// Each rate-limit key maps to a sorted set scored by timestamp, so range
/// queries and retention sweeps are single commands. Members carry a UUID so
/// concurrent writers from multiple instances never collide, plus the entry
/// weight. A side index set tracks every live key, which is what lets the
/// retention sweep run without a SCAN over the whole keyspace.
pub struct RedisLogStore {
    connection: Arc<tokio::sync::Mutex<ConnectionManager>>,
    config: RedisConfig,
}

// Manually implement Debug; ConnectionManager is not Debug
impl fmt::Debug for RedisLogStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisLogStore")
            .field("url", &self.config.url)
            .field("namespace", &self.config.namespace)
            .finish()
    }
}

impl Clone for RedisLogStore {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            config: self.config.clone(),
        }
    }
}

impl RedisLogStore {
    /// Connects to Redis with the configured timeout.
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        // Opening the client does not touch the network yet
        let client = Client::open(config.url.as_str())
            .map_err(|e| RateLimiterError::Storage(StorageError::RedisConnection(e.to_string())))?;

        let connection_future = ConnectionManager::new(client);

        let connection_manager =
            match tokio::time::timeout(config.connection_timeout, connection_future).await {
                Ok(result) => result.map_err(|e| {
                    RateLimiterError::Storage(StorageError::RedisConnection(e.to_string()))
                })?,
                Err(_) => {
                    return Err(RateLimiterError::Storage(StorageError::RedisConnection(
                        format!(
                            "Connection to Redis at {} timed out after {:?}",
                            config.url, config.connection_timeout
                        ),
                    )));
                }
            };

        Ok(Self {
            connection: Arc::new(tokio::sync::Mutex::new(connection_manager)),
            config,
        })
    }

    /// Ping Redis to check health with timeout
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.lock().await;

        let ping_future = redis::AsyncCommands::ping::<String>(&mut *conn);

        let result = match tokio::time::timeout(self.config.connection_timeout, ping_future).await {
            Ok(inner_result) => inner_result?,
            Err(_) => {
                return Err(RateLimiterError::Storage(StorageError::RedisCommand(
                    format!(
                        "Redis PING operation timed out after {:?}",
                        self.config.connection_timeout
                    ),
                )));
            }
        };

        if result == "PONG" {
            Ok(())
        } else {
            Err(RateLimiterError::Storage(StorageError::RedisCommand(
                format!("Unexpected response from Redis PING: {}", result),
            )))
        }
    }

    fn log_key(&self, key: &str) -> String {
        format!("{}:log:{}", self.config.namespace, key)
    }

    fn index_key(&self) -> String {
        format!("{}:keys", self.config.namespace)
    }

    fn parse_member(member: &str, timestamp: f64) -> LogEntry {
        // Member layout is "uuid:weight"; fall back to weight 1.0 on rows
        // written by older deployments
        let weight = member
            .rsplit(':')
            .next()
            .and_then(|w| w.parse::<f64>().ok())
            .unwrap_or(1.0);

        LogEntry {
            timestamp: timestamp as i64,
            weight,
        }
    }
}

#[async_trait]
impl RequestLogStore for RedisLogStore {
    async fn insert(&self, key: &str, timestamp: i64, weight: f64) -> Result<()> {
        let log_key = self.log_key(key);
        let member = format!("{}:{}", Uuid::new_v4(), weight);

        let mut conn = self.connection.lock().await;
        let _: i64 = conn.zadd(&log_key, member, timestamp).await?;
        let _: i64 = conn.sadd(self.index_key(), key).await?;

        Ok(())
    }

    async fn query_range(&self, key: &str, from: i64) -> Result<Vec<LogEntry>> {
        let log_key = self.log_key(key);

        let mut conn = self.connection.lock().await;
        // ZRANGEBYSCORE returns ascending score order
        let rows: Vec<(String, f64)> = conn
            .zrangebyscore_withscores(&log_key, from, "+inf")
            .await?;

        Ok(rows
            .into_iter()
            .map(|(member, score)| Self::parse_member(&member, score))
            .collect())
    }

    async fn delete_older_than(&self, cutoff: i64) -> Result<u64> {
        let mut conn = self.connection.lock().await;
        let keys: Vec<String> = conn.smembers(self.index_key()).await?;

        let mut removed = 0u64;
        for key in keys {
            let log_key = self.log_key(&key);
            let deleted: i64 = conn
                .zrembyscore(&log_key, "-inf", format!("({}", cutoff))
                .await?;
            removed += deleted.max(0) as u64;

            // Empty sorted sets vanish from Redis; drop them from the index
            let remaining: i64 = conn.zcard(&log_key).await?;
            if remaining == 0 {
                let _: i64 = conn.srem(self.index_key(), &key).await?;
            }
        }

        Ok(removed)
    }

    async fn delete_by_key(&self, key: &str) -> Result<u64> {
        let log_key = self.log_key(key);

        let mut conn = self.connection.lock().await;
        let count: i64 = conn.zcard(&log_key).await?;
        let _: i64 = conn.del(&log_key).await?;
        let _: i64 = conn.srem(self.index_key(), key).await?;

        Ok(count.max(0) as u64)
    }
}
