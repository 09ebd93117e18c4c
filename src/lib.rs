//! dotnation-cache: the data cache behind the DotNation dashboard.
//!
//! Contract queries against the donation platform are slow and rate limited,
//! so the dashboard memoizes their results:
//!   CacheManager (bounded TTL store) → AsyncCache (one fetch per key)
//!   PersistentCache (same store, snapshotted to a durable slot)
//!
//! Caches are plain values: construct them where they are needed and pass
//! them down. There is no global instance.

pub mod cache;
pub mod config;
pub mod storage;

pub use cache::{AsyncCache, CacheEntry, CacheManager, CacheStats, CacheStore, PersistentCache};
pub use config::{CacheConfig, Config, ConfigError, PersistenceConfig};
