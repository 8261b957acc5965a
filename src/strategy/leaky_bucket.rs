// src/strategy/leaky_bucket.rs

use crate::config::RateLimitConfig;
use crate::strategy::{retry_after_secs, RateLimitDecision, RateLimitEntry};

/// Leaky bucket admission check.
///
/// Each admission adds one unit to the bucket; the bucket drains at
/// `max_requests / window` units per millisecond, computed lazily from
/// `last_refill`. The level only ever rises by admission and falls
/// monotonically with elapsed time, floored at zero.
pub(crate) fn check(
    slot: &mut Option<RateLimitEntry>,
    config: &RateLimitConfig,
    now: i64,
) -> RateLimitDecision {
    let limit = config.max_requests;
    let capacity = limit as f64;
    let leak_rate = capacity / config.window_millis() as f64; // units per ms

    let entry = match slot {
        Some(entry) => entry,
        None => {
            let reset_at = now + drain_millis(1.0, leak_rate);
            *slot = Some(RateLimitEntry {
                count: 1.0,
                reset_at,
                first_request_at: now,
                tokens: None,
                last_refill: Some(now),
            });
            return RateLimitDecision::new(true, limit - 1, limit, reset_at, None);
        }
    };

    let last_leak = entry.last_refill.unwrap_or(now);
    let elapsed = (now - last_leak).max(0) as f64;

    entry.count = (entry.count - elapsed * leak_rate).max(0.0);
    entry.last_refill = Some(now);

    if entry.count >= capacity {
        // Wait until the level drops far enough below capacity for one unit
        let overflow = entry.count - capacity + 1.0;
        let wait_ms = drain_millis(overflow, leak_rate);
        entry.reset_at = now + drain_millis(entry.count, leak_rate);
        let retry = retry_after_secs(wait_ms);
        return RateLimitDecision::new(false, 0, limit, entry.reset_at, Some(retry));
    }

    entry.count += 1.0;
    entry.reset_at = now + drain_millis(entry.count, leak_rate);

    let remaining = (capacity - entry.count).floor().max(0.0) as u64;
    RateLimitDecision::new(true, remaining, limit, entry.reset_at, None)
}

/// Milliseconds until `units` have fully drained at `leak_rate` units/ms.
fn drain_millis(units: f64, leak_rate: f64) -> i64 {
    (units / leak_rate).ceil() as i64
}
