//! dotnation-cache: inspect and edit a persistent DotNation cache snapshot.
//!
//! Opens the file-backed slot named in the configuration, runs one command
//! against it and writes the result back.

use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tracing::info;

use dotnation_cache::cache::clock::SystemClock;
use dotnation_cache::cache::PersistentCache;
use dotnation_cache::config::{Cli, Command, Config};
use dotnation_cache::storage::codec::SnapshotCodec;
use dotnation_cache::storage::file_slot::FileSlot;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "dotnation_cache=debug"
    } else {
        "dotnation_cache=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());

    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    // Load configuration.
    let config = Config::load(&cli.config)?;
    let slot = FileSlot::from_config(&config.persistence)?;

    info!(
        slot = %slot.path().display(),
        ttl_ms = config.cache.ttl_ms,
        max_size = config.cache.max_size,
        compress = config.persistence.compress,
        "Opening cache"
    );

    let mut cache: PersistentCache<Value, FileSlot> = PersistentCache::with_codec(
        config.cache.clone(),
        slot,
        SnapshotCodec::from_config(&config.persistence),
        Arc::new(SystemClock),
    )?;

    run(&mut cache, cli.command)
}

fn run(cache: &mut PersistentCache<Value, FileSlot>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Get { key } => match cache.get(&key) {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => anyhow::bail!("{key}: not found"),
        },
        Command::Set { key, value, ttl_ms } => {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            cache.set(&key, value, ttl_ms.map(std::time::Duration::from_millis));
            info!(key, "Stored");
        }
        Command::Delete { key } => {
            let existed = cache.delete(&key);
            cache.flush()?;
            println!("{}", if existed { "deleted" } else { "absent" });
        }
        Command::Invalidate { pattern } => {
            let removed = cache.invalidate(&pattern);
            cache.flush()?;
            println!("{removed}");
        }
        Command::Prune => {
            let removed = cache.prune();
            cache.flush()?;
            println!("{removed}");
        }
        Command::Stats => {
            println!("{}", serde_json::to_string_pretty(&cache.stats())?);
        }
        Command::Keys => {
            for key in cache.keys() {
                let state = if cache.has(&key) { "live" } else { "expired" };
                println!("{key}\t{state}");
            }
        }
        Command::Clear => {
            cache.clear();
            info!("Cache cleared");
        }
    }

    Ok(())
}
