//! The synchronous store interface shared by in-memory and persistent caches.

use std::time::Duration;

use crate::cache::entry::CacheStats;

/// Operations every cache backend supports.
///
/// None of these suspend, so a caller holding a lock around the store sees
/// each call as atomic.
pub trait CacheStore<V> {
    /// Live value for `key`; counts a hit or a miss.
    fn get(&mut self, key: &str) -> Option<V>;

    /// Insert or replace `key`, with an optional TTL override.
    fn set(&mut self, key: &str, value: V, ttl: Option<Duration>);

    /// Whether `key` holds a live value. Does not count.
    fn has(&self, key: &str) -> bool;

    fn delete(&mut self, key: &str) -> bool;

    /// Remove keys matching `pattern`; returns how many went.
    fn invalidate(&mut self, pattern: &str) -> usize;

    /// Remove expired entries; returns how many went.
    fn prune(&mut self) -> usize;

    fn stats(&self) -> CacheStats;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether writes reach durable storage and may block on I/O.
    fn persists(&self) -> bool {
        false
    }
}
