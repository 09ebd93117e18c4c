//! TTL cache management.
//!
//! This module contains the core cache data structures and algorithms:
//! - [`entry`]: CacheEntry, KeyPattern, CacheStats
//! - [`manager`]: the bounded TTL store with FIFO eviction
//! - [`evictor`]: first-insert eviction order
//! - [`async_cache`]: single-flight async fills
//! - [`persistent`]: snapshot-backed cache that survives restarts
//! - [`clock`]: wall and manual time sources

pub mod async_cache;
pub mod clock;
pub mod entry;
pub mod evictor;
pub mod manager;
pub mod persistent;
pub mod store;

pub use async_cache::AsyncCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, CacheStats, KeyPattern};
pub use manager::CacheManager;
pub use persistent::{PersistError, PersistentCache};
pub use store::CacheStore;
