//! Snapshot encoding for durable slots.
//!
//! A snapshot is the full entry set of a cache as one JSON document,
//! optionally wrapped in a zstd frame. Decoding sniffs the zstd magic so a
//! slot written with either setting can be read back.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::clock::Millis;
use crate::cache::entry::CacheEntry;
use crate::config::PersistenceConfig;

/// First four bytes of every zstd frame.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zstd error: {0}")]
    Zstd(#[from] std::io::Error),
}

/// The persisted document: `{ "entries": [[key, entry], ...], "savedAt": ms }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<V> {
    pub entries: Vec<(String, CacheEntry<V>)>,
    pub saved_at: Millis,
}

/// Encodes and decodes snapshots.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCodec {
    /// zstd level, or `None` for plain JSON.
    zstd_level: Option<i32>,
}

impl SnapshotCodec {
    pub fn json() -> Self {
        Self { zstd_level: None }
    }

    pub fn zstd(level: i32) -> Self {
        Self {
            zstd_level: Some(level),
        }
    }

    pub fn from_config(config: &PersistenceConfig) -> Self {
        if config.compress {
            Self::zstd(config.zstd_level)
        } else {
            Self::json()
        }
    }

    pub fn encode<V: Serialize>(&self, snapshot: &Snapshot<V>) -> Result<Vec<u8>, SnapshotError> {
        let json = serde_json::to_vec(snapshot)?;
        match self.zstd_level {
            Some(level) => Ok(zstd::encode_all(json.as_slice(), level)?),
            None => Ok(json),
        }
    }

    pub fn decode<V: DeserializeOwned>(&self, data: &[u8]) -> Result<Snapshot<V>, SnapshotError> {
        if data.starts_with(&ZSTD_MAGIC) {
            let json = zstd::decode_all(data)?;
            Ok(serde_json::from_slice(&json)?)
        } else {
            Ok(serde_json::from_slice(data)?)
        }
    }
}
