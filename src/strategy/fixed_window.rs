// src/strategy/fixed_window.rs

use crate::config::RateLimitConfig;
use crate::strategy::{retry_after_secs, RateLimitDecision, RateLimitEntry};

/// Fixed window admission check.
///
/// Cheapest strategy: O(1) against the in-process table, no durable read.
/// The window boundary can admit up to 2x `max_requests` across an edge;
/// that burst property is the accepted cost of the O(1) check and callers
/// choosing this strategy opt into it.
pub(crate) fn check(
    slot: &mut Option<RateLimitEntry>,
    config: &RateLimitConfig,
    now: i64,
) -> RateLimitDecision {
    let limit = config.max_requests;
    let window = config.window_millis();

    match slot {
        // Fresh key or lapsed window: start a new one, this request counts
        None => {
            let reset_at = now + window;
            *slot = Some(RateLimitEntry {
                count: 1.0,
                reset_at,
                first_request_at: now,
                tokens: None,
                last_refill: None,
            });
            RateLimitDecision::new(true, limit - 1, limit, reset_at, None)
        }
        Some(entry) if entry.reset_at <= now => {
            let reset_at = now + window;
            entry.count = 1.0;
            entry.reset_at = reset_at;
            entry.first_request_at = now;
            RateLimitDecision::new(true, limit - 1, limit, reset_at, None)
        }
        Some(entry) => {
            if entry.count as u64 >= limit {
                let retry = retry_after_secs(entry.reset_at - now);
                return RateLimitDecision::new(false, 0, limit, entry.reset_at, Some(retry));
            }

            entry.count += 1.0;
            let remaining = limit.saturating_sub(entry.count as u64);
            RateLimitDecision::new(true, remaining, limit, entry.reset_at, None)
        }
    }
}
