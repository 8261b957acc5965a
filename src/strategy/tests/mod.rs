// src/strategy/tests/mod.rs

mod sliding_window_tests;

use crate::config::RateLimitConfig;
use std::time::Duration;

pub(crate) fn test_config(max_requests: u64, window_ms: u64) -> RateLimitConfig {
    RateLimitConfig::new(Duration::from_millis(window_ms), max_requests)
        .expect("valid test config")
}
