//! Runtime configuration for dotnation-cache.
//!
//! Configuration can be loaded from a JSON file or constructed programmatically.
//! Cache sizing, TTL and snapshot persistence knobs all live here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::clock::duration_ms;

/// Default name of the durable slot backing a persistent cache.
pub const DEFAULT_SLOT_NAME: &str = "dotnation-cache";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ttl must be positive")]
    ZeroTtl,

    #[error("max_size must be positive")]
    ZeroMaxSize,

    #[error("zstd level {0} is outside 1..=22")]
    InvalidZstdLevel(i32),
}

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "dotnation-cache", about = "Inspect and edit a persistent DotNation cache")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "cache.json")]
    pub config: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations exposed by the binary.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the value stored under a key.
    Get { key: String },

    /// Store a JSON value under a key.
    Set {
        key: String,
        /// Value as a JSON document (bare words are stored as strings).
        value: String,
        /// Per-entry TTL override in milliseconds.
        #[arg(long)]
        ttl_ms: Option<u64>,
    },

    /// Remove a single key.
    Delete { key: String },

    /// Remove every key matching a prefix or `prefix*` pattern.
    Invalidate { pattern: String },

    /// Drop expired entries.
    Prune,

    /// Print hit/miss statistics.
    Stats,

    /// List stored keys in eviction order.
    Keys,

    /// Empty the cache and delete its durable slot.
    Clear,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// In-memory cache sizing.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Snapshot persistence.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Sizing and expiry for a single cache instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default time-to-live for entries, in milliseconds.
    pub ttl_ms: u64,

    /// Maximum number of entries held at once.
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 5 * 60 * 1000, // 5 minutes
            max_size: 100,
        }
    }
}

impl CacheConfig {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            ttl_ms: duration_ms(ttl),
            max_size,
        }
    }

    /// Set the default TTL (builder pattern).
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = duration_ms(ttl);
        self
    }

    /// Set the size bound (builder pattern).
    #[must_use]
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn ttl_duration(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_ms == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        if self.max_size == 0 {
            return Err(ConfigError::ZeroMaxSize);
        }
        Ok(())
    }
}

/// Where and how snapshots are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Directory holding slot files.
    pub dir: PathBuf,

    /// Slot name; the file is `<dir>/<slot_name>.json`.
    pub slot_name: String,

    /// Apply zstd compression to snapshots.
    pub compress: bool,

    /// zstd compression level (1-22).
    pub zstd_level: i32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".cache"),
            slot_name: DEFAULT_SLOT_NAME.to_string(),
            compress: false,
            zstd_level: 3,
        }
    }
}

impl PersistenceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compress && !(1..=22).contains(&self.zstd_level) {
            return Err(ConfigError::InvalidZstdLevel(self.zstd_level));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let data = std::fs::read_to_string(path)?;
            serde_json::from_str::<Config>(&data)?
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.persistence.validate()
    }
}
