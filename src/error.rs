//! Error types for the Floodgate rate limiter.

use thiserror::Error;

use crate::ratelimit::Scope;

/// Main error type for Floodgate operations.
#[derive(Error, Debug)]
pub enum FloodgateError {
    /// A rate string such as `"100/min"` could not be parsed.
    #[error("Invalid rate spec '{rate}': {reason}")]
    InvalidRateSpec { rate: String, reason: String },

    /// The caller has used up its quota for the current window.
    #[error("Rate limit exceeded: {rate}")]
    RateLimitExceeded { rate: String, scope: Scope },

    /// The counter store could not be reached or returned an error.
    #[error("Storage failure: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FloodgateError {
    pub(crate) fn invalid_rate(rate: &str, reason: impl Into<String>) -> Self {
        FloodgateError::InvalidRateSpec {
            rate: rate.to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap any backend error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FloodgateError::Storage(Box::new(err))
    }

    /// Whether this error is the expected over-limit signal.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FloodgateError::RateLimitExceeded { .. })
    }

    pub fn is_storage_failure(&self) -> bool {
        matches!(self, FloodgateError::Storage(_))
    }
}

impl From<redis::RedisError> for FloodgateError {
    fn from(err: redis::RedisError) -> Self {
        FloodgateError::storage(err)
    }
}

impl From<config::ConfigError> for FloodgateError {
    fn from(err: config::ConfigError) -> Self {
        FloodgateError::Config(err.to_string())
    }
}

/// Result type alias for Floodgate operations.
pub type Result<T> = std::result::Result<T, FloodgateError>;
