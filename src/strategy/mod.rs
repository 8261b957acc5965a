// src/strategy/mod.rs

pub mod fixed_window;
pub mod leaky_bucket;
pub mod sliding_window;
pub mod token_bucket;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RateLimiterError;

/// The four admission-control strategies.
///
/// A closed enum with exhaustive dispatch: there is no silent default for an
/// unknown name, the string boundary fails fast instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Weighted request log, most precise, shared-store backed
    #[default]
    SlidingWindow,
    /// O(1) in-process counter with the known boundary-burst trade-off
    FixedWindow,
    /// Lazily refilled token bucket, allows bursts up to capacity
    TokenBucket,
    /// Lazily drained bucket, smooths admission rate
    LeakyBucket,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::SlidingWindow => "sliding_window",
            Strategy::FixedWindow => "fixed_window",
            Strategy::TokenBucket => "token_bucket",
            Strategy::LeakyBucket => "leaky_bucket",
        };
        f.write_str(name)
    }
}

impl FromStr for Strategy {
    type Err = RateLimiterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sliding_window" => Ok(Strategy::SlidingWindow),
            "fixed_window" => Ok(Strategy::FixedWindow),
            "token_bucket" => Ok(Strategy::TokenBucket),
            "leaky_bucket" => Ok(Strategy::LeakyBucket),
            other => Err(RateLimiterError::Config(format!(
                "Unknown strategy: {}",
                other
            ))),
        }
    }
}

/// Outcome of one admission check. Denial is a normal value, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,

    /// Requests left in the current window/bucket
    pub remaining: u64,

    /// The configured ceiling, echoed for header generation
    pub limit: u64,

    /// When the current window/bucket fully clears
    pub reset_time: DateTime<Utc>,

    /// How long the caller must wait, whole seconds rounded up.
    /// Present if and only if the request was denied.
    pub retry_after: Option<u64>,
}

impl RateLimitDecision {
    pub(crate) fn new(
        allowed: bool,
        remaining: u64,
        limit: u64,
        reset_millis: i64,
        retry_after: Option<u64>,
    ) -> Self {
        Self {
            allowed,
            remaining,
            limit,
            reset_time: DateTime::from_timestamp_millis(reset_millis).unwrap_or_default(),
            retry_after,
        }
    }
}

/// Mutable per-key state for the in-process strategies.
///
/// Counts may be fractional: the leaky bucket drains continuously and the
/// token bucket refills continuously. All time math happens lazily at check
/// time from `last_refill`, there is no background ticking per key.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitEntry {
    /// Current count (fixed window: whole admissions, leaky bucket: level)
    pub count: f64,

    /// When the window/bucket fully clears, unix ms
    pub reset_at: i64,

    /// First observed request for this key in the current window, unix ms
    pub first_request_at: i64,

    /// Token-bucket remaining tokens, bounded by `max_requests`
    pub tokens: Option<f64>,

    /// Last lazy refill/leak computation, unix ms
    pub last_refill: Option<i64>,
}

/// Rounds a millisecond interval up to whole seconds for Retry-After.
pub(crate) fn retry_after_secs(millis: i64) -> u64 {
    let millis = millis.max(0) as u64;
    millis.div_ceil(1000)
}
