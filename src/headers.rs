// src/headers.rs

use std::collections::HashMap;

use crate::config::RateLimitConfig;
use crate::strategy::RateLimitDecision;

/// Renders a decision as rate-limit response headers.
///
/// Pure and deterministic: no state access, safe to call any number of
/// times for the same decision. The config flags select which of the two
/// header families are emitted; Retry-After variants appear only on denial.
pub fn rate_limit_headers(
    decision: &RateLimitDecision,
    config: &RateLimitConfig,
) -> HashMap<String, String> {
    let mut headers = HashMap::new();

    if config.standard_headers {
        headers.insert("RateLimit-Limit".to_string(), decision.limit.to_string());
        headers.insert(
            "RateLimit-Remaining".to_string(),
            decision.remaining.to_string(),
        );
        headers.insert(
            "RateLimit-Reset".to_string(),
            decision.reset_time.to_rfc3339(),
        );
        if let Some(retry_after) = decision.retry_after {
            headers.insert("Retry-After".to_string(), retry_after.to_string());
        }
    }

    if config.legacy_headers {
        headers.insert("X-RateLimit-Limit".to_string(), decision.limit.to_string());
        headers.insert(
            "X-RateLimit-Remaining".to_string(),
            decision.remaining.to_string(),
        );
        headers.insert(
            "X-RateLimit-Reset".to_string(),
            decision.reset_time.timestamp().to_string(),
        );
        if let Some(retry_after) = decision.retry_after {
            headers.insert("X-Retry-After".to_string(), retry_after.to_string());
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::RateLimitDecision;
    use std::time::Duration;

    fn config(standard: bool, legacy: bool) -> RateLimitConfig {
        let mut config = RateLimitConfig::new(Duration::from_secs(60), 10).unwrap();
        config.standard_headers = standard;
        config.legacy_headers = legacy;
        config
    }

    #[test]
    fn standard_family_only() {
        let decision = RateLimitDecision::new(true, 7, 10, 1_700_000_000_000, None);
        let headers = rate_limit_headers(&decision, &config(true, false));

        assert_eq!(headers.get("RateLimit-Limit").unwrap(), "10");
        assert_eq!(headers.get("RateLimit-Remaining").unwrap(), "7");
        assert!(headers.contains_key("RateLimit-Reset"));
        assert!(!headers.contains_key("X-RateLimit-Limit"));
        assert!(!headers.contains_key("Retry-After"));
    }

    #[test]
    fn legacy_reset_is_epoch_seconds() {
        let decision = RateLimitDecision::new(true, 7, 10, 1_700_000_000_000, None);
        let headers = rate_limit_headers(&decision, &config(false, true));

        assert_eq!(headers.get("X-RateLimit-Reset").unwrap(), "1700000000");
        assert!(!headers.contains_key("RateLimit-Limit"));
    }

    #[test]
    fn retry_after_present_iff_denied() {
        let denied = RateLimitDecision::new(false, 0, 10, 1_700_000_000_000, Some(42));
        let headers = rate_limit_headers(&denied, &config(true, true));
        assert_eq!(headers.get("Retry-After").unwrap(), "42");
        assert_eq!(headers.get("X-Retry-After").unwrap(), "42");

        let allowed = RateLimitDecision::new(true, 3, 10, 1_700_000_000_000, None);
        let headers = rate_limit_headers(&allowed, &config(true, true));
        assert!(!headers.contains_key("Retry-After"));
        assert!(!headers.contains_key("X-Retry-After"));
    }

    #[test]
    fn remaining_matches_decision() {
        for remaining in [0u64, 1, 5, 10] {
            let decision = RateLimitDecision::new(true, remaining, 10, 1_700_000_000_000, None);
            let headers = rate_limit_headers(&decision, &config(true, true));
            assert_eq!(
                headers.get("RateLimit-Remaining").unwrap(),
                &remaining.to_string()
            );
            assert_eq!(
                headers.get("X-RateLimit-Remaining").unwrap(),
                &remaining.to_string()
            );
        }
    }
}
