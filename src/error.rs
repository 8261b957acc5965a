// for error definitions
use redis;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RateLimiterError {
    /// Configuration-related errors (invalid limits, unknown strategy names)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to the request log store
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RateLimiterError {
    /// Whether this error came from the durable store. Storage failures on
    /// the check path are recovered locally (fail-open) instead of being
    /// surfaced to the caller.
    pub fn is_storage(&self) -> bool {
        matches!(self, RateLimiterError::Storage(_))
    }
}

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Redis connection errors
    #[error("Redis connection error: {0}")]
    RedisConnection(String),

    // Redis authentication errors
    #[error("Redis authentication error: {0}")]
    RedisAuth(String),

    /// Redis command errors
    #[error("Redis command error: {0}")]
    RedisCommand(String),

    /// Data serialization/deserialization errors
    #[error("Data serialization error: {0}")]
    Serialization(String),
}

// Implement conversions from redis::RedisError to StorageError
impl From<redis::RedisError> for RateLimiterError {
    fn from(err: redis::RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::AuthenticationFailed => {
                RateLimiterError::Storage(StorageError::RedisAuth(err.to_string()))
            }
            redis::ErrorKind::IoError | redis::ErrorKind::ClientError => {
                // Connection-related errors
                RateLimiterError::Storage(StorageError::RedisConnection(err.to_string()))
            }
            _ => {
                // Command/operation related errors
                RateLimiterError::Storage(StorageError::RedisCommand(err.to_string()))
            }
        }
    }
}

// implement conversions from serde_json::Error to RateLimiterError
impl From<serde_json::Error> for RateLimiterError {
    fn from(err: serde_json::Error) -> Self {
        RateLimiterError::Storage(StorageError::Serialization(err.to_string()))
    }
}

// define a Result type alias for convenience
pub type Result<T> = std::result::Result<T, RateLimiterError>;
