//! Cache manager: the bounded, TTL-expiring key/value store.
//!
//! The manager is the core data structure of the crate. It:
//! - Stores entries with a per-entry expiry
//! - Evicts the oldest-inserted key when a new key would exceed `max_size`
//! - Removes keys by prefix or wildcard pattern
//! - Tracks hit/miss counters
//!
//! Expired entries stay in memory until `prune`, `delete` or eviction removes
//! them; they are simply never returned.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::clock::{duration_ms, system_clock, Millis, SharedClock};
use crate::cache::entry::{CacheEntry, CacheStats, KeyPattern};
use crate::cache::evictor::{Evictor, Seq};
use crate::cache::store::CacheStore;
use crate::config::{CacheConfig, ConfigError};

#[derive(Debug, Clone)]
struct Stored<V> {
    entry: CacheEntry<V>,
    seq: Seq,
}

/// Bounded TTL cache with FIFO eviction.
pub struct CacheManager<V> {
    /// All entries indexed by key.
    entries: HashMap<String, Stored<V>>,

    /// First-insert order of keys.
    evictor: Evictor,

    ttl_ms: u64,
    max_size: usize,

    hits: u64,
    misses: u64,

    clock: SharedClock,
}

impl<V> std::fmt::Debug for CacheManager<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("size", &self.entries.len())
            .field("max_size", &self.max_size)
            .field("ttl_ms", &self.ttl_ms)
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}

impl<V: Clone> CacheManager<V> {
    /// Create a cache on the wall clock.
    pub fn new(config: CacheConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, system_clock())
    }

    /// Create a cache with an explicit time source.
    pub fn with_clock(config: CacheConfig, clock: SharedClock) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            entries: HashMap::new(),
            evictor: Evictor::new(),
            ttl_ms: config.ttl_ms,
            max_size: config.max_size,
            hits: 0,
            misses: 0,
            clock,
        })
    }

    fn now(&self) -> Millis {
        self.clock.now_ms()
    }

    /// Insert or replace `key`.
    ///
    /// A replaced key keeps its original eviction position.
    pub fn set(&mut self, key: &str, value: V, ttl: Option<Duration>) {
        let now = self.now();
        let ttl_ms = ttl.map(duration_ms).unwrap_or(self.ttl_ms);
        let entry = CacheEntry::new(value, now, ttl_ms);

        if let Some(stored) = self.entries.get_mut(key) {
            stored.entry = entry;
            return;
        }

        if self.entries.len() >= self.max_size {
            self.evict_oldest();
        }

        let seq = self.evictor.record(key);
        self.entries.insert(key.to_string(), Stored { entry, seq });
        self.compact();
    }

    /// Insert a pre-built entry verbatim, e.g. from a snapshot.
    pub fn insert_entry(&mut self, key: &str, entry: CacheEntry<V>) {
        if let Some(stored) = self.entries.get_mut(key) {
            stored.entry = entry;
            return;
        }
        if self.entries.len() >= self.max_size {
            self.evict_oldest();
        }
        let seq = self.evictor.record(key);
        self.entries.insert(key.to_string(), Stored { entry, seq });
    }

    /// Look up a live value, counting a hit or a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.now();
        match self.entries.get(key) {
            Some(stored) if stored.entry.is_live(now) => {
                self.hits += 1;
                Some(stored.entry.value.clone())
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Look up a live entry without touching the counters.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry<V>> {
        let now = self.now();
        self.entries
            .get(key)
            .map(|stored| &stored.entry)
            .filter(|entry| entry.is_live(now))
    }

    pub fn has(&self, key: &str) -> bool {
        self.peek(key).is_some()
    }

    /// Remove `key`. Expired-but-unswept entries still count as existing.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove every key matching `pattern` (`prefix`, `prefix*` or a glob).
    pub fn invalidate(&mut self, pattern: &str) -> usize {
        let pattern = KeyPattern::parse(pattern);
        let before = self.entries.len();
        self.entries.retain(|key, _| !pattern.matches(key));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(?pattern, removed, "Invalidated keys");
            self.compact();
        }
        removed
    }

    /// Remove every entry expired as of now.
    pub fn prune(&mut self) -> usize {
        let now = self.now();
        let before = self.entries.len();
        self.entries.retain(|_, stored| stored.entry.is_live(now));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "Pruned expired entries");
            self.compact();
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats::new(self.hits, self.misses, self.entries.len(), self.max_size)
    }

    /// Drop all entries and reset the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.evictor.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn config(&self) -> CacheConfig {
        CacheConfig {
            ttl_ms: self.ttl_ms,
            max_size: self.max_size,
        }
    }

    /// Stored keys (live and expired) in eviction order, oldest first.
    pub fn keys(&self) -> Vec<String> {
        self.entries().map(|(key, _)| key.to_string()).collect()
    }

    /// Stored entries (live and expired) in eviction order, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &CacheEntry<V>)> + '_ {
        let entries = &self.entries;
        self.evictor
            .ordered(move |k| entries.get(k).map(|s| s.seq))
            .filter_map(move |key| entries.get(key).map(|s| (key, &s.entry)))
    }

    fn evict_oldest(&mut self) {
        let entries = &self.entries;
        if let Some(victim) = self.evictor.pop_oldest(|k| entries.get(k).map(|s| s.seq)) {
            self.entries.remove(&victim);
            debug!(key = %victim, max_size = self.max_size, "Evicted oldest entry");
        }
    }

    fn compact(&mut self) {
        let entries = &self.entries;
        self.evictor.compact(entries.len(), |k| entries.get(k).map(|s| s.seq));
    }
}

impl<V: Clone> CacheStore<V> for CacheManager<V> {
    fn get(&mut self, key: &str) -> Option<V> {
        CacheManager::get(self, key)
    }

    fn set(&mut self, key: &str, value: V, ttl: Option<Duration>) {
        CacheManager::set(self, key, value, ttl)
    }

    fn has(&self, key: &str) -> bool {
        CacheManager::has(self, key)
    }

    fn delete(&mut self, key: &str) -> bool {
        CacheManager::delete(self, key)
    }

    fn invalidate(&mut self, pattern: &str) -> usize {
        CacheManager::invalidate(self, pattern)
    }

    fn prune(&mut self) -> usize {
        CacheManager::prune(self)
    }

    fn stats(&self) -> CacheStats {
        CacheManager::stats(self)
    }

    fn clear(&mut self) {
        CacheManager::clear(self)
    }

    fn len(&self) -> usize {
        CacheManager::len(self)
    }
}
