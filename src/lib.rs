// library entry
pub mod clock;
pub mod config;
pub mod error;
pub mod headers;
pub mod limiter;
pub mod logging;
pub mod resilience;
pub mod store;
pub mod strategy;

#[cfg(test)]
mod test_utils;

#[cfg(test)]
mod tests;

// Re-export key components for convenience
pub use clock::{Clock, SystemClock};
pub use config::{policies, CleanupConfig, RateLimitConfig, RedisConfig};
pub use error::{RateLimiterError, Result, StorageError};
pub use headers::rate_limit_headers;
pub use limiter::{CleanupStats, RateLimiter};
pub use logging::init as init_logging;
pub use store::{LogEntry, MemoryLogStore, RedisLogStore, RequestLogStore};
pub use strategy::{RateLimitDecision, Strategy};
