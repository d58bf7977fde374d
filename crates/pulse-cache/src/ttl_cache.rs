//! Generic TTL cache.

use std::collections::HashMap;

use parking_lot::Mutex;
use pulse_core::{key_has_segment, SharedClock, TimestampMs};
use tracing::trace;

/// Cached value with its insertion time.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: TimestampMs,
}

/// Key/value store where every entry expires `ttl_ms` after insertion.
///
/// An entry is valid iff `now - stored_at < ttl_ms`. The TTL belongs to the
/// instance, not to individual entries. All operations take the instance
/// mutex, and `get` returns a clone so no caller aliases cached data.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl_ms: u64,
    clock: SharedClock,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache.
    pub fn new(ttl_ms: u64, clock: SharedClock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_ms,
            clock,
        }
    }

    /// Configured TTL in milliseconds.
    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Get a fresh value. Expired entries are evicted and reported absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();

        let entry = entries.get(key)?;
        if self.is_valid(entry, now) {
            return Some(entry.value.clone());
        }

        entries.remove(key);
        trace!(key, "Evicted expired cache entry");
        None
    }

    /// Insert or overwrite `key`, stamped with the current time.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now_ms(),
        };
        self.entries.lock().insert(key.into(), entry);
    }

    /// True iff an entry exists and is within TTL. Never evicts.
    pub fn is_fresh(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| self.is_valid(entry, now))
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Remove every entry whose key contains `pattern` as a substring.
    ///
    /// Returns the number of removed entries.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        self.remove_where(|key| key.contains(pattern))
    }

    /// Remove every entry whose key has a part exactly equal to `segment`.
    ///
    /// Unlike [`invalidate_pattern`](Self::invalidate_pattern), `"A"` does
    /// not match a key built for `"BA"`.
    pub fn invalidate_segment(&self, segment: &str) -> usize {
        self.remove_where(|key| key_has_segment(key, segment))
    }

    /// Drop expired entries without touching fresh ones.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| self.is_valid(entry, now));
        before - entries.len()
    }

    /// Number of stored entries, including not yet evicted expired ones.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn remove_where(&self, predicate: impl Fn(&str) -> bool) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !predicate(key));
        before - entries.len()
    }

    fn is_valid(&self, entry: &CacheEntry<V>, now: TimestampMs) -> bool {
        now.saturating_sub(entry.stored_at) < self.ttl_ms
    }
}
