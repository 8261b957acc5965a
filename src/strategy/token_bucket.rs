// src/strategy/token_bucket.rs

use crate::config::RateLimitConfig;
use crate::strategy::{retry_after_secs, RateLimitDecision, RateLimitEntry};

/// Token bucket admission check.
///
/// The bucket holds up to `max_requests` tokens and refills at
/// `max_requests / window` tokens per millisecond. Refill happens lazily at
/// check time from `last_refill`, so idle keys cost nothing until their next
/// request.
pub(crate) fn check(
    slot: &mut Option<RateLimitEntry>,
    config: &RateLimitConfig,
    now: i64,
) -> RateLimitDecision {
    let limit = config.max_requests;
    let capacity = limit as f64;
    let refill_rate = capacity / config.window_millis() as f64; // tokens per ms

    let entry = match slot {
        Some(entry) => entry,
        None => {
            // First use: a full bucket minus the token this request consumes
            let reset_at = now + config.window_millis();
            *slot = Some(RateLimitEntry {
                count: 1.0,
                reset_at,
                first_request_at: now,
                tokens: Some(capacity - 1.0),
                last_refill: Some(now),
            });
            return RateLimitDecision::new(true, limit - 1, limit, reset_at, None);
        }
    };

    let last_refill = entry.last_refill.unwrap_or(now);
    let elapsed = (now - last_refill).max(0) as f64;
    let mut tokens = entry.tokens.unwrap_or(capacity);

    tokens = (tokens + elapsed * refill_rate).min(capacity);
    entry.last_refill = Some(now);

    if tokens < 1.0 {
        entry.tokens = Some(tokens);
        // Time until one whole token is available
        let wait_ms = ((1.0 - tokens) / refill_rate).ceil() as i64;
        entry.reset_at = now + wait_ms;
        let retry = retry_after_secs(wait_ms);
        return RateLimitDecision::new(false, 0, limit, entry.reset_at, Some(retry));
    }

    tokens -= 1.0;
    entry.tokens = Some(tokens);
    entry.count += 1.0;

    // Bucket clears once the consumed tokens have all refilled
    let missing = capacity - tokens;
    entry.reset_at = now + (missing / refill_rate).ceil() as i64;

    RateLimitDecision::new(true, tokens.floor() as u64, limit, entry.reset_at, None)
}
