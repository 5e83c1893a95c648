//! In-process counter store.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use super::clock::{Clock, SystemClock};
use super::store::CounterStore;
use crate::error::Result;

/// Per-key counter state.
#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    /// Hits counted in the current window
    count: u64,
    /// When the current window ends
    window_expires_at: Instant,
}

/// A counter store local to this process.
///
/// Counters live in a sharded map. The check-reset-increment sequence runs
/// while the shard entry is locked, so concurrent increments on one key are
/// serialized while unrelated keys proceed in parallel.
///
/// Entries for keys that stop receiving traffic are kept until the key is
/// seen again, unless [`MemoryStore::purge_expired`] is called.
pub struct MemoryStore<C: Clock = SystemClock> {
    counters: DashMap<String, CounterEntry>,
    clock: C,
}

impl MemoryStore<SystemClock> {
    /// Create an empty store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    /// Create an empty store reading time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            counters: DashMap::new(),
            clock,
        }
    }

    /// Number of keys currently tracked, expired or not.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Drop every entry whose window has already elapsed.
    ///
    /// Returns how many entries were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.counters.len();
        self.counters.retain(|_, entry| now < entry.window_expires_at);
        let removed = before.saturating_sub(self.counters.len());
        trace!(removed = removed, "Purged expired counters");
        removed
    }

    fn increment_entry(entry: &mut CounterEntry, now: Instant, window: Duration) -> u64 {
        if now >= entry.window_expires_at {
            entry.count = 0;
            entry.window_expires_at = now + window;
        }
        entry.count += 1;
        entry.count
    }
}

#[async_trait]
impl<C: Clock + 'static> CounterStore for MemoryStore<C> {
    async fn increment(&self, key: &str, window_secs: u64) -> Result<u64> {
        let window = Duration::from_secs(window_secs);

        // Fast path for existing keys avoids allocating the owned key.
        if let Some(mut entry) = self.counters.get_mut(key) {
            let now = self.clock.now();
            return Ok(Self::increment_entry(&mut entry, now, window));
        }

        let mut entry = self.counters.entry(key.to_string()).or_insert_with(|| {
            trace!(key = %key, window_secs = window_secs, "Creating counter");
            CounterEntry {
                count: 0,
                window_expires_at: self.clock.now() + window,
            }
        });
        let now = self.clock.now();
        Ok(Self::increment_entry(&mut entry, now, window))
    }
}
