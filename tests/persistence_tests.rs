//! Integration tests for snapshot persistence.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use dotnation_cache::cache::clock::ManualClock;
use dotnation_cache::cache::PersistentCache;
use dotnation_cache::config::{CacheConfig, PersistenceConfig};
use dotnation_cache::storage::codec::SnapshotCodec;
use dotnation_cache::storage::file_slot::FileSlot;
use dotnation_cache::storage::slot::DurableSlot;

fn open(
    dir: &TempDir,
    clock: &ManualClock,
    codec: SnapshotCodec,
) -> PersistentCache<serde_json::Value, FileSlot> {
    let slot = FileSlot::new(dir.path(), "dotnation-cache").unwrap();
    PersistentCache::with_codec(
        CacheConfig::new(Duration::from_secs(60), 10),
        slot,
        codec,
        Arc::new(clock.clone()),
    )
    .unwrap()
}

#[test]
fn test_survives_restart() {
    let tmp = TempDir::new().unwrap();
    let clock = ManualClock::new(1_000);

    let mut cache = open(&tmp, &clock, SnapshotCodec::json());
    cache.set("p", serde_json::json!("q"), None);
    cache.set("goal", serde_json::json!({"target": 500, "raised": 120}), None);
    drop(cache);

    let mut fresh = open(&tmp, &clock, SnapshotCodec::json());
    assert_eq!(fresh.get("p"), Some(serde_json::json!("q")));
    assert_eq!(fresh.get("goal").unwrap()["raised"], 120);
    assert_eq!(fresh.keys(), vec!["p", "goal"]);
}

#[test]
fn test_restored_entry_keeps_original_expiry() {
    let tmp = TempDir::new().unwrap();
    let clock = ManualClock::new(0);

    let mut cache = open(&tmp, &clock, SnapshotCodec::json());
    cache.set("k", serde_json::json!(1), Some(Duration::from_secs(5)));

    clock.advance(Duration::from_secs(4));
    assert!(open(&tmp, &clock, SnapshotCodec::json()).has("k"));

    clock.advance(Duration::from_secs(1));
    assert!(!open(&tmp, &clock, SnapshotCodec::json()).has("k"));
}

#[test]
fn test_clear_deletes_slot() {
    let tmp = TempDir::new().unwrap();
    let clock = ManualClock::new(0);

    let mut cache = open(&tmp, &clock, SnapshotCodec::json());
    cache.set("a", serde_json::json!(true), None);
    let path = cache.slot().path().to_path_buf();
    assert!(path.exists());

    cache.clear();
    assert!(!path.exists());
    assert!(cache.slot().load().unwrap().is_none());

    let fresh = open(&tmp, &clock, SnapshotCodec::json());
    assert!(fresh.is_empty());
}

#[test]
fn test_corrupt_file_starts_empty() {
    let tmp = TempDir::new().unwrap();
    let clock = ManualClock::new(0);
    std::fs::write(tmp.path().join("dotnation-cache.json"), b"{\"entries\": [[\"a\"").unwrap();

    let mut cache = open(&tmp, &clock, SnapshotCodec::json());
    assert!(cache.is_empty());
    assert_eq!(cache.get("a"), None);
}

#[test]
fn test_compressed_slot_round_trip() {
    let tmp = TempDir::new().unwrap();
    let clock = ManualClock::new(0);
    let persistence = PersistenceConfig {
        dir: tmp.path().to_path_buf(),
        compress: true,
        ..Default::default()
    };

    let mut cache = open(&tmp, &clock, SnapshotCodec::from_config(&persistence));
    cache.set("a", serde_json::json!("x".repeat(512)), None);
    let raw = std::fs::read(cache.slot().path()).unwrap();
    assert!(raw.len() < 512);

    // A plain-JSON reader still understands the compressed slot.
    let mut fresh = open(&tmp, &clock, SnapshotCodec::json());
    assert_eq!(fresh.get("a"), Some(serde_json::json!("x".repeat(512))));
}

#[test]
fn test_flush_persists_invalidate_and_prune() {
    let tmp = TempDir::new().unwrap();
    let clock = ManualClock::new(0);

    let mut cache = open(&tmp, &clock, SnapshotCodec::json());
    cache.set("user:1", serde_json::json!(1), None);
    cache.set("user:2", serde_json::json!(2), None);
    cache.set("tmp", serde_json::json!(3), Some(Duration::from_millis(10)));

    clock.advance(Duration::from_secs(1));
    assert_eq!(cache.invalidate("user:1"), 1);
    assert_eq!(cache.prune(), 1);
    cache.flush().unwrap();

    let fresh = open(&tmp, &clock, SnapshotCodec::json());
    assert_eq!(fresh.keys(), vec!["user:2"]);
}
