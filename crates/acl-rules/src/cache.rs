//! Bounded decision cache keyed by destination.
//!
//! Backed by `moka::sync::Cache`: TinyLFU admission keeps one-off scans of
//! many destinations from flushing frequently used entries, and LRU order
//! picks eviction victims. Reads and inserts are safe from any thread.

use moka::sync::Cache;

use crate::rule::Action;

/// Default number of cached destinations.
pub const DEFAULT_CACHE_CAPACITY: u64 = 1024;

pub(crate) struct DecisionCache {
    inner: Cache<String, Action>,
    capacity: u64,
}

impl DecisionCache {
    pub(crate) fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::new(capacity),
            capacity,
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<Action> {
        self.inner.get(key)
    }

    /// Store a decision. Concurrent misses on the same key may both land
    /// here; the values are identical so the last write wins harmlessly.
    pub(crate) fn insert(&self, key: String, action: Action) {
        self.inner.insert(key, action);
    }

    /// Number of live entries after applying pending evictions.
    pub(crate) fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    pub(crate) fn capacity(&self) -> u64 {
        self.capacity
    }
}
