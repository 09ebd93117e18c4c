//! Durable storage for cache snapshots.
//!
//! - [`slot`]: the `DurableSlot` trait and an in-memory slot
//! - [`file_slot`]: atomic file-backed slot
//! - [`codec`]: snapshot document encoding (JSON, optional zstd)

pub mod codec;
pub mod file_slot;
pub mod slot;
