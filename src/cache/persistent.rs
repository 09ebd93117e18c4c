//! A cache that survives restarts through a durable slot.
//!
//! On construction the slot is read and every stored entry is loaded as-is;
//! stale entries are hidden lazily like any other expired entry. Every `set`
//! rewrites the whole snapshot and `clear` deletes the slot. Slot failures
//! are logged and otherwise ignored: the in-memory cache keeps working.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::clock::{system_clock, SharedClock};
use crate::cache::entry::{CacheEntry, CacheStats};
use crate::cache::manager::CacheManager;
use crate::cache::store::CacheStore;
use crate::config::{CacheConfig, ConfigError};
use crate::storage::codec::{Snapshot, SnapshotCodec, SnapshotError};
use crate::storage::slot::{DurableSlot, SlotError};

#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// `CacheManager` mirrored to a durable slot.
pub struct PersistentCache<V, S = Box<dyn DurableSlot>> {
    inner: CacheManager<V>,
    slot: S,
    codec: SnapshotCodec,
    clock: SharedClock,
}

impl<V, S> PersistentCache<V, S>
where
    V: Clone + Serialize + DeserializeOwned,
    S: DurableSlot,
{
    /// Open a cache over `slot` with plain JSON snapshots on the wall clock.
    pub fn open(config: CacheConfig, slot: S) -> Result<Self, ConfigError> {
        Self::with_codec(config, slot, SnapshotCodec::json(), system_clock())
    }

    /// Open a cache over `slot`, rehydrating whatever it holds.
    pub fn with_codec(
        config: CacheConfig,
        slot: S,
        codec: SnapshotCodec,
        clock: SharedClock,
    ) -> Result<Self, ConfigError> {
        let inner = CacheManager::with_clock(config, clock.clone())?;
        let mut cache = Self {
            inner,
            slot,
            codec,
            clock,
        };
        cache.rehydrate();
        Ok(cache)
    }

    fn rehydrate(&mut self) {
        let data = match self.slot.load() {
            Ok(Some(data)) => data,
            Ok(None) => return,
            Err(e) => {
                warn!(
                    slot = self.slot.name(),
                    error = %e,
                    "Failed to read cache slot, starting empty"
                );
                return;
            }
        };

        let snapshot: Snapshot<V> = match self.codec.decode(&data) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    slot = self.slot.name(),
                    error = %e,
                    "Corrupt cache snapshot, starting empty"
                );
                return;
            }
        };

        let count = snapshot.entries.len();
        for (key, entry) in snapshot.entries {
            self.inner.insert_entry(&key, entry);
        }

        info!(
            slot = self.slot.name(),
            entries = count,
            loaded = self.inner.len(),
            saved_at = snapshot.saved_at,
            "Loaded cache snapshot"
        );
    }

    fn snapshot(&self) -> Snapshot<V> {
        Snapshot {
            entries: self
                .inner
                .entries()
                .map(|(key, entry)| (key.to_string(), entry.clone()))
                .collect(),
            saved_at: self.clock.now_ms(),
        }
    }

    /// Write the full current entry set to the slot.
    pub fn flush(&self) -> Result<(), PersistError> {
        let data = self.codec.encode(&self.snapshot())?;
        self.slot.store(&data)?;
        Ok(())
    }

    fn save(&self) {
        if let Err(e) = self.flush() {
            warn!(slot = self.slot.name(), error = %e, "Failed to save cache snapshot");
        }
    }

    /// Insert or replace `key`, then persist the full snapshot.
    pub fn set(&mut self, key: &str, value: V, ttl: Option<Duration>) {
        self.inner.set(key, value, ttl);
        self.save();
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        self.inner.get(key)
    }

    pub fn peek(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.inner.peek(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.has(key)
    }

    /// In-memory only; call [`flush`](Self::flush) to persist.
    pub fn delete(&mut self, key: &str) -> bool {
        self.inner.delete(key)
    }

    /// In-memory only; call [`flush`](Self::flush) to persist.
    pub fn invalidate(&mut self, pattern: &str) -> usize {
        self.inner.invalidate(pattern)
    }

    /// In-memory only; call [`flush`](Self::flush) to persist.
    pub fn prune(&mut self) -> usize {
        self.inner.prune()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }

    /// Empty memory and delete the slot.
    pub fn clear(&mut self) {
        self.inner.clear();
        if let Err(e) = self.slot.remove() {
            warn!(slot = self.slot.name(), error = %e, "Failed to delete cache slot");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }
}

impl<V, S> CacheStore<V> for PersistentCache<V, S>
where
    V: Clone + Serialize + DeserializeOwned,
    S: DurableSlot,
{
    fn get(&mut self, key: &str) -> Option<V> {
        PersistentCache::get(self, key)
    }

    fn set(&mut self, key: &str, value: V, ttl: Option<Duration>) {
        PersistentCache::set(self, key, value, ttl)
    }

    fn has(&self, key: &str) -> bool {
        PersistentCache::has(self, key)
    }

    fn delete(&mut self, key: &str) -> bool {
        PersistentCache::delete(self, key)
    }

    fn invalidate(&mut self, pattern: &str) -> usize {
        PersistentCache::invalidate(self, pattern)
    }

    fn prune(&mut self) -> usize {
        PersistentCache::prune(self)
    }

    fn stats(&self) -> CacheStats {
        PersistentCache::stats(self)
    }

    fn clear(&mut self) {
        PersistentCache::clear(self)
    }

    fn len(&self) -> usize {
        PersistentCache::len(self)
    }

    fn persists(&self) -> bool {
        true
    }
}
