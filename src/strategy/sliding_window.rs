// src/strategy/sliding_window.rs

use crate::config::RateLimitConfig;
use crate::error::Result;
use crate::store::{LogEntry, RequestLogStore};
use crate::strategy::{retry_after_secs, RateLimitDecision};

/// Sliding window admission check.
///
/// The most precise strategy and the only one backed by the shared request
/// log, so it enforces a cross-instance limit. Each logged request
/// contributes `weight * (1 - age/window)` to the effective count: full
/// weight at arrival, decaying linearly to zero at the far edge of the
/// window. The fractional total smooths the boundary jump a fixed window
/// would show.
pub(crate) async fn check<S>(
    store: &S,
    key: &str,
    config: &RateLimitConfig,
    now: i64,
) -> Result<RateLimitDecision>
where
    S: RequestLogStore + ?Sized,
{
    let limit = config.max_requests;
    let window = config.window_millis();
    let window_start = now - window;

    let entries = store.query_range(key, window_start).await?;
    let weighted = weighted_count(&entries, now, window);

    let allowed = weighted < limit as f64;

    if allowed {
        store.insert(key, now, 1.0).await?;
    }

    // The window fully clears once the oldest logged request ages out
    let reset_at = entries
        .first()
        .map(|entry| entry.timestamp + window)
        .unwrap_or(now + window);

    let retry_after = if allowed {
        None
    } else {
        // Guarded fallback: a denial with no entries should not happen, but
        // a full window wait is the safe answer if it does
        let wait_ms = entries
            .first()
            .map(|entry| entry.timestamp + window - now)
            .unwrap_or(window);
        Some(retry_after_secs(wait_ms).max(1))
    };

    let mut remaining = (limit as f64 - weighted.ceil()).max(0.0) as u64;
    if allowed {
        // Account for the request just logged
        remaining = remaining.saturating_sub(1);
    }

    Ok(RateLimitDecision::new(
        allowed,
        remaining,
        limit,
        reset_at,
        retry_after,
    ))
}

/// Fractional estimate of effective requests currently in the window.
fn weighted_count(entries: &[LogEntry], now: i64, window: i64) -> f64 {
    entries
        .iter()
        .map(|entry| {
            let age = (now - entry.timestamp).max(0) as f64;
            let window_weight = (1.0 - age / window as f64).max(0.0);
            entry.weight * window_weight
        })
        .sum()
}
