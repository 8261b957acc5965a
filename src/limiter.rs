// src/limiter.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{CleanupConfig, RateLimitConfig};
use crate::error::Result;
use crate::headers::rate_limit_headers;
use crate::rate_limit_event;
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig};
use crate::store::RequestLogStore;
use crate::strategy::{
    fixed_window, leaky_bucket, sliding_window, token_bucket, RateLimitDecision, RateLimitEntry,
    Strategy,
};

/// Process-local map from composite key to mutable counter/bucket state.
///
/// Fixed-window, token-bucket and leaky-bucket decisions run entirely under
/// this lock, so two concurrent checks for the same fresh key can never both
/// initialize independently. Nothing awaits while the lock is held.
#[derive(Debug, Default)]
pub(crate) struct StateTable {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl StateTable {
    /// Runs `f` against the slot for `key`, atomically. The closure sees
    /// `None` for an unseen key and may populate or clear the slot.
    fn with_entry<R>(&self, key: &str, f: impl FnOnce(&mut Option<RateLimitEntry>) -> R) -> R {
        let mut entries = self.entries.lock().unwrap();
        let mut slot = entries.remove(key);
        let result = f(&mut slot);
        if let Some(entry) = slot {
            entries.insert(key.to_string(), entry);
        }
        result
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
    }

    /// Drops entries whose decision window has fully elapsed. Safe to run
    /// concurrently with live checks; only already-expired state is touched.
    fn purge_expired(&self, now: i64) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.reset_at > now);
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// Counts from one cleanup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupStats {
    /// In-process entries dropped because their window elapsed
    pub expired_entries: usize,
    /// Durable log rows deleted past the retention horizon
    pub deleted_log_rows: u64,
}

/// The single entry point for admission control.
///
/// An explicit, constructible service: it owns its state table, store handle
/// and cleanup task, so tests can run isolated instances and shut them down
/// deterministically. Denial is a normal return value; the only errors a
/// caller sees are configuration mistakes and non-recoverable store failures
/// on explicit operations like `reset`.
#[derive(Debug)]
pub struct RateLimiter<S: RequestLogStore + 'static> {
    store: Arc<S>,
    state: Arc<StateTable>,
    clock: Arc<dyn Clock>,
    cleanup: CleanupConfig,
    breaker: CircuitBreaker,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl<S: RequestLogStore + 'static> RateLimiter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            state: Arc::new(StateTable::default()),
            clock: Arc::new(SystemClock),
            cleanup: CleanupConfig::default(),
            breaker: CircuitBreaker::default(),
            cleanup_task: Mutex::new(None),
        }
    }

    /// Replaces the wall clock, for deterministic tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cleanup_config(mut self, cleanup: CleanupConfig) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn with_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker = CircuitBreaker::new(config);
        self
    }

    /// Decides whether a request from `identifier` may proceed under
    /// `config`, using the given strategy.
    ///
    /// Sliding-window checks consult the shared request log; if the store is
    /// unavailable the check fails open to in-process window accounting for
    /// that call rather than failing the guarded operation. The other three
    /// strategies are in-process only, which under horizontal scale-out
    /// means per-instance quota.
    pub async fn check_limit(
        &self,
        identifier: &str,
        config: &RateLimitConfig,
        strategy: Strategy,
    ) -> Result<RateLimitDecision> {
        config.validate()?;

        let key = config.key_for(identifier);
        let now = self.clock.now_millis();

        let decision = match strategy {
            Strategy::SlidingWindow => self.check_sliding(&key, config, now).await?,
            Strategy::FixedWindow => self
                .state
                .with_entry(&key, |slot| fixed_window::check(slot, config, now)),
            Strategy::TokenBucket => self
                .state
                .with_entry(&key, |slot| token_bucket::check(slot, config, now)),
            Strategy::LeakyBucket => self
                .state
                .with_entry(&key, |slot| leaky_bucket::check(slot, config, now)),
        };

        rate_limit_event!(
            key.as_str(),
            strategy,
            decision.allowed,
            decision.remaining,
            decision.limit
        );

        Ok(decision)
    }

    async fn check_sliding(
        &self,
        key: &str,
        config: &RateLimitConfig,
        now: i64,
    ) -> Result<RateLimitDecision> {
        if !self.breaker.allow_request() {
            debug!(key, "circuit open, using in-process accounting");
            return Ok(self.in_process_fallback(key, config, now));
        }

        match sliding_window::check(self.store.as_ref(), key, config, now).await {
            Ok(decision) => {
                self.breaker.record_success();
                Ok(decision)
            }
            Err(e) if e.is_storage() => {
                self.breaker.record_failure();
                warn!(
                    key,
                    error = %e,
                    "request log store unavailable, falling back to in-process accounting"
                );
                Ok(self.in_process_fallback(key, config, now))
            }
            Err(e) => Err(e),
        }
    }

    /// Degraded sliding-window path: in-process window accounting under the
    /// same config. Less accurate (per-instance, no smoothing) but the
    /// guarded operation keeps working while the store is down.
    fn in_process_fallback(
        &self,
        key: &str,
        config: &RateLimitConfig,
        now: i64,
    ) -> RateLimitDecision {
        self.state
            .with_entry(key, |slot| fixed_window::check(slot, config, now))
    }

    /// Clears all limiter state for `identifier`, in-process and durable.
    /// Idempotent: resetting an unseen key is a no-op.
    pub async fn reset(&self, identifier: &str, prefix: Option<&str>) -> Result<()> {
        let key = match prefix {
            Some(prefix) => format!("{}:{}", prefix, identifier),
            None => identifier.to_string(),
        };

        self.state.remove(&key);
        self.store.delete_by_key(&key).await?;

        debug!(key = %key, "rate limit state reset");
        Ok(())
    }

    /// One cleanup pass: drops in-process entries whose window elapsed and
    /// durable log rows older than the retention horizon.
    pub async fn cleanup(&self) -> Result<CleanupStats> {
        let now = self.clock.now_millis();
        let expired_entries = self.state.purge_expired(now);

        let cutoff = now - self.cleanup.log_retention.as_millis() as i64;
        let deleted_log_rows = self.store.delete_older_than(cutoff).await?;

        debug!(expired_entries, deleted_log_rows, "cleanup pass complete");
        Ok(CleanupStats {
            expired_entries,
            deleted_log_rows,
        })
    }

    /// Starts the periodic cleanup task. Idempotent; a second call while
    /// the task is running does nothing.
    pub fn start(&self) {
        let mut slot = self.cleanup_task.lock().unwrap();
        if slot.is_some() {
            return;
        }

        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let interval = self.cleanup.interval;
        let retention_ms = self.cleanup.log_retention.as_millis() as i64;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so the first real
            // pass happens one interval after start
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let now = clock.now_millis();
                let expired = state.purge_expired(now);
                match store.delete_older_than(now - retention_ms).await {
                    Ok(rows) => debug!(expired, rows, "scheduled cleanup pass complete"),
                    Err(e) => warn!(error = %e, "scheduled cleanup failed to prune request log"),
                }
            }
        });

        *slot = Some(handle);
        debug!(interval_secs = interval.as_secs(), "cleanup task started");
    }

    /// Stops the periodic cleanup task if it is running.
    pub fn stop(&self) {
        if let Some(handle) = self.cleanup_task.lock().unwrap().take() {
            handle.abort();
            debug!("cleanup task stopped");
        }
    }

    /// Renders a decision as response headers per the config's flags.
    pub fn get_rate_limit_headers(
        &self,
        decision: &RateLimitDecision,
        config: &RateLimitConfig,
    ) -> HashMap<String, String> {
        rate_limit_headers(decision, config)
    }

    /// Number of keys with live in-process state, for diagnostics.
    pub fn tracked_keys(&self) -> usize {
        self.state.len()
    }
}

impl<S: RequestLogStore + 'static> Drop for RateLimiter<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup_task.lock().unwrap().take() {
            handle.abort();
        }
    }
}
