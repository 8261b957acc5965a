// src/config/mod.rs

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{RateLimiterError, Result};

/// Configuration for a single named limit policy.
///
/// One of these is supplied per protected operation ("login attempts",
/// "search requests", ...). The config is immutable; state keyed off it
/// lives in the limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// The time window over which requests are counted
    #[serde(with = "duration_serde")]
    pub window: Duration,

    /// Maximum number of requests allowed in the window
    pub max_requests: u64,

    /// Optional namespace prepended to every identifier (`prefix:identifier`)
    #[serde(default)]
    pub key_prefix: Option<String>,

    /// Only failed outcomes count toward this limit. Interpreted by the
    /// caller before invoking the limiter; the limiter itself is
    /// outcome-agnostic.
    #[serde(default)]
    pub skip_successful_requests: bool,

    /// Only successful outcomes count toward this limit (see above)
    #[serde(default)]
    pub skip_failed_requests: bool,

    /// User-facing denial text for the caller to attach to 429 responses
    #[serde(default)]
    pub message: Option<String>,

    /// Emit the RateLimit-* header family
    #[serde(default = "default_true")]
    pub standard_headers: bool,

    /// Emit the X-RateLimit-* header family
    #[serde(default)]
    pub legacy_headers: bool,
}

fn default_true() -> bool {
    true
}

impl RateLimitConfig {
    /// Creates a validated config with the given window and ceiling.
    pub fn new(window: Duration, max_requests: u64) -> Result<Self> {
        let config = Self {
            window,
            max_requests,
            key_prefix: None,
            skip_successful_requests: false,
            skip_failed_requests: false,
            message: None,
            standard_headers: true,
            legacy_headers: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects configs that can never admit anything or have no window.
    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(RateLimiterError::Config(
                "max_requests must be greater than zero".to_string(),
            ));
        }
        if self.window.is_zero() {
            return Err(RateLimiterError::Config(
                "window must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Composite key scoping limiter state to a caller+policy pair.
    pub fn key_for(&self, identifier: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, identifier),
            None => identifier.to_string(),
        }
    }

    /// Window length in milliseconds, the unit all strategy math runs in.
    pub fn window_millis(&self) -> i64 {
        self.window.as_millis() as i64
    }
}

/// Named policy registry.
///
/// These defaults cover the protected operations of the surrounding system;
/// callers may also build ad-hoc configs with `RateLimitConfig::new`.
pub mod policies {
    use super::RateLimitConfig;
    use std::time::Duration;

    fn policy(window: Duration, max_requests: u64, prefix: &str, message: &str) -> RateLimitConfig {
        RateLimitConfig {
            window,
            max_requests,
            key_prefix: Some(prefix.to_string()),
            skip_successful_requests: false,
            skip_failed_requests: false,
            message: Some(message.to_string()),
            standard_headers: true,
            legacy_headers: true,
        }
    }

    /// Login attempts: 5 per 15 minutes, failures only.
    pub fn login_attempts() -> RateLimitConfig {
        let mut config = policy(
            Duration::from_secs(15 * 60),
            5,
            "login",
            "Too many login attempts, please try again later",
        );
        // only failed attempts consume the budget
        config.skip_successful_requests = true;
        config
    }

    /// Account registration: 3 per hour.
    pub fn registration() -> RateLimitConfig {
        let mut config = policy(
            Duration::from_secs(60 * 60),
            3,
            "register",
            "Too many accounts created, please try again later",
        );
        config.skip_failed_requests = true;
        config
    }

    /// General API traffic: 100 per minute.
    pub fn general_api() -> RateLimitConfig {
        policy(
            Duration::from_secs(60),
            100,
            "api",
            "Too many requests, please slow down",
        )
    }

    /// Search queries: 30 per minute.
    pub fn search() -> RateLimitConfig {
        policy(
            Duration::from_secs(60),
            30,
            "search",
            "Too many search requests, please slow down",
        )
    }

    /// Data export: 10 per hour.
    pub fn export() -> RateLimitConfig {
        policy(
            Duration::from_secs(60 * 60),
            10,
            "export",
            "Export limit reached, please try again later",
        )
    }

    /// Clinical record access: stricter tier, 30 per minute.
    pub fn clinical_access() -> RateLimitConfig {
        policy(
            Duration::from_secs(60),
            30,
            "clinical",
            "Record access limit reached, please slow down",
        )
    }

    /// Realtime connection attempts: 5 per minute.
    pub fn realtime_connect() -> RateLimitConfig {
        policy(
            Duration::from_secs(60),
            5,
            "rt-connect",
            "Too many connection attempts, please try again later",
        )
    }

    /// Realtime message sends: 10 per second.
    pub fn realtime_message() -> RateLimitConfig {
        policy(
            Duration::from_secs(1),
            10,
            "rt-message",
            "Sending messages too quickly, please slow down",
        )
    }

    /// Look up a policy by its registry name.
    pub fn by_name(name: &str) -> Option<RateLimitConfig> {
        match name {
            "login_attempts" => Some(login_attempts()),
            "registration" => Some(registration()),
            "general_api" => Some(general_api()),
            "search" => Some(search()),
            "export" => Some(export()),
            "clinical_access" => Some(clinical_access()),
            "realtime_connect" => Some(realtime_connect()),
            "realtime_message" => Some(realtime_message()),
            _ => None,
        }
    }

    /// All registry names, for CLI listings.
    pub const NAMES: &[&str] = &[
        "login_attempts",
        "registration",
        "general_api",
        "search",
        "export",
        "clinical_access",
        "realtime_connect",
        "realtime_message",
    ];
}

/// Configuration for the facade's background cleanup task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// How often the cleanup task runs
    #[serde(default = "default_cleanup_interval", with = "duration_serde")]
    pub interval: Duration,

    /// How long request log rows are retained before the sweep deletes them
    #[serde(default = "default_log_retention", with = "duration_serde")]
    pub log_retention: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval: default_cleanup_interval(),
            log_retention: default_log_retention(),
        }
    }
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_log_retention() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

/// Configuration for the Redis request log store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Namespace prepended to every Redis key owned by the store
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Connection timeout
    #[serde(default = "default_conn_timeout", with = "duration_serde")]
    pub connection_timeout: Duration,
}

fn default_namespace() -> String {
    "ratelimit".to_string()
}

fn default_conn_timeout() -> Duration {
    Duration::from_secs(2)
}

// Helper module to serialize/deserialize Duration with serde
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
