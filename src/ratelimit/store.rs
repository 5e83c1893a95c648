//! Counter store trait for abstracting in-process and shared implementations.

use async_trait::async_trait;

use crate::error::Result;

/// Storage for fixed-window request counters.
///
/// Implementations must make the check-reset-increment sequence atomic per
/// key: for a fixed key, the Nth call inside an unbroken window returns N,
/// and the first call after the window has elapsed returns 1.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Count one more hit for `key` and return the count for the current window.
    ///
    /// A key that is absent, or whose previous window has elapsed, starts a
    /// fresh window of `window_secs` seconds with a count of 1.
    ///
    /// # Errors
    ///
    /// Returns [`FloodgateError::Storage`](crate::error::FloodgateError::Storage)
    /// when the backing store fails. Callers must not treat that as either an
    /// allow or a deny.
    async fn increment(&self, key: &str, window_secs: u64) -> Result<u64>;
}

