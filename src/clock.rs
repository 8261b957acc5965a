// src/clock.rs

use chrono::Utc;
use std::fmt::Debug;
use std::sync::Arc;

/// Time source for every limiter decision.
///
/// Strategy math only ever needs "now" as unix milliseconds; keeping it
/// behind a trait lets tests drive the engines with a manual clock instead
/// of sleeping.
pub trait Clock: Send + Sync + Debug {
    /// Current time as unix epoch milliseconds.
    fn now_millis(&self) -> i64;
}

/// Wall-clock implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

impl Clock for Arc<dyn Clock> {
    fn now_millis(&self) -> i64 {
        self.as_ref().now_millis()
    }
}
