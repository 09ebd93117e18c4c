//! Benchmarks for the cache subsystem.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use dotnation_cache::cache::{AsyncCache, CacheManager, CacheEntry};
use dotnation_cache::config::CacheConfig;
use dotnation_cache::storage::codec::{Snapshot, SnapshotCodec};

fn bench_set_with_eviction(c: &mut Criterion) {
    let config = CacheConfig::new(Duration::from_secs(300), 1_000);
    let mut cache: CacheManager<u64> = CacheManager::new(config).unwrap();
    let keys: Vec<String> = (0..10_000).map(|i| format!("campaign:{i}")).collect();

    c.bench_function("set_10k_into_1k_bound", |b| {
        b.iter(|| {
            for (i, key) in keys.iter().enumerate() {
                cache.set(black_box(key), i as u64, None);
            }
        })
    });
}

fn bench_get_hit(c: &mut Criterion) {
    let config = CacheConfig::new(Duration::from_secs(300), 10_000);
    let mut cache: CacheManager<u64> = CacheManager::new(config).unwrap();
    let keys: Vec<String> = (0..10_000).map(|i| format!("campaign:{i}")).collect();
    for (i, key) in keys.iter().enumerate() {
        cache.set(key, i as u64, None);
    }

    c.bench_function("get_hit_10k", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(cache.get(key));
            }
        })
    });
}

fn bench_invalidate_prefix(c: &mut Criterion) {
    let keys: Vec<String> = (0..5_000)
        .map(|i| format!("user:{}:campaign:{}", i % 50, i))
        .collect();

    c.bench_function("invalidate_prefix_5k", |b| {
        b.iter_batched(
            || {
                let config = CacheConfig::new(Duration::from_secs(300), 5_000);
                let mut cache: CacheManager<u64> = CacheManager::new(config).unwrap();
                for (i, key) in keys.iter().enumerate() {
                    cache.set(key, i as u64, None);
                }
                cache
            },
            |mut cache| black_box(cache.invalidate("user:7:*")),
            criterion::BatchSize::LargeInput,
        )
    });
}

fn bench_snapshot_encode(c: &mut Criterion) {
    let snapshot = Snapshot {
        entries: (0..1_000)
            .map(|i| (format!("campaign:{i}"), CacheEntry::new(i as u64, 0, 60_000)))
            .collect(),
        saved_at: 0,
    };
    let json = SnapshotCodec::json();
    let zstd = SnapshotCodec::zstd(3);

    c.bench_function("snapshot_encode_json_1k", |b| {
        b.iter(|| black_box(json.encode(&snapshot)))
    });
    c.bench_function("snapshot_encode_zstd_1k", |b| {
        b.iter(|| black_box(zstd.encode(&snapshot)))
    });
}

fn bench_async_hit(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let config = CacheConfig::new(Duration::from_secs(300), 100);
    let cache: AsyncCache<u64, String> = AsyncCache::new(CacheManager::new(config).unwrap());
    runtime.block_on(async {
        cache.get_or_compute("hot", || async { Ok(42) }).await.unwrap();
    });

    c.bench_function("async_get_or_compute_hit", |b| {
        b.iter(|| {
            runtime.block_on(async {
                black_box(cache.get_or_compute("hot", || async { Ok(0) }).await)
            })
        })
    });
}

criterion_group!(
    benches,
    bench_set_with_eviction,
    bench_get_hit,
    bench_invalidate_prefix,
    bench_snapshot_encode,
    bench_async_hit,
);
criterion_main!(benches);
