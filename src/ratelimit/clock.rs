//! Time sources for the in-process counter store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Provides the current instant so window expiry can be driven by tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Monotonic system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// give the other to a store.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<RwLock<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            current: Arc::new(RwLock::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.current.write() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.current.read()
    }
}
