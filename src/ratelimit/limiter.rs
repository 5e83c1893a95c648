//! Core rate limiter implementation.

use std::sync::Arc;
use tracing::{debug, trace};

use super::key::LimitKey;
use super::rate::RateSpec;
use super::store::CounterStore;
use crate::error::{FloodgateError, Result};

/// Default rate when none is configured.
pub const DEFAULT_RATE: &str = "60/min";

/// Outcome of an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateStatus {
    /// Hits counted in the current window, including this one
    pub count: u64,
    /// The limit that was applied
    pub limit: u64,
    /// Hits still available in the current window
    pub remaining: u64,
    /// Window length in seconds
    pub window_secs: u64,
}

/// The fixed-window rate limiter.
///
/// One instance is built at startup and shared behind an `Arc` by every
/// enforcement point; it holds no per-key state of its own.
pub struct RateLimiter {
    /// Counter storage shared by every scope
    store: Arc<dyn CounterStore>,
    /// Rate used when a check does not name one
    default_rate: String,
}

impl RateLimiter {
    /// Create a rate limiter over `store`.
    ///
    /// # Errors
    ///
    /// Returns [`FloodgateError::InvalidRateSpec`] if `default_rate` does not parse.
    pub fn new(store: Arc<dyn CounterStore>, default_rate: impl Into<String>) -> Result<Self> {
        let default_rate = default_rate.into();
        RateSpec::parse(&default_rate)?;
        Ok(Self {
            store,
            default_rate,
        })
    }

    /// Create a rate limiter with [`DEFAULT_RATE`].
    pub fn with_store(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            default_rate: DEFAULT_RATE.to_string(),
        }
    }

    pub fn default_rate(&self) -> &str {
        &self.default_rate
    }

    /// Count one hit against `key` and compare it with `rate`.
    ///
    /// Only a count strictly above the limit is rejected.
    ///
    /// # Errors
    ///
    /// - [`FloodgateError::InvalidRateSpec`] if `rate` does not parse; nothing is counted.
    /// - [`FloodgateError::RateLimitExceeded`] with `rate` and the key's scope when over limit.
    /// - [`FloodgateError::Storage`] if the counter store fails.
    pub async fn check_limit(&self, key: &LimitKey, rate: &str) -> Result<RateStatus> {
        let spec = RateSpec::parse(rate)?;

        trace!(key = %key, rate = %rate, "Checking rate limit");

        let count = self.store.increment(key.as_str(), spec.window_secs()).await?;

        if count > spec.limit() {
            debug!(
                key = %key,
                count = count,
                limit = spec.limit(),
                "Rate limit exceeded"
            );
            return Err(FloodgateError::RateLimitExceeded {
                rate: rate.to_string(),
                scope: key.scope().clone(),
            });
        }

        Ok(RateStatus {
            count,
            limit: spec.limit(),
            remaining: spec.limit() - count,
            window_secs: spec.window_secs(),
        })
    }

    /// [`check_limit`](Self::check_limit) with the default rate.
    pub async fn check_default(&self, key: &LimitKey) -> Result<RateStatus> {
        self.check_limit(key, &self.default_rate).await
    }
}
