//! Durable slots: named places that hold exactly one snapshot.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to persist snapshot to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A named location holding a single serialized snapshot.
pub trait DurableSlot: Send + Sync {
    fn name(&self) -> &str;

    /// Current contents, or `None` if the slot is empty.
    fn load(&self) -> Result<Option<Vec<u8>>, SlotError>;

    /// Replace the contents.
    fn store(&self, data: &[u8]) -> Result<(), SlotError>;

    /// Delete the slot. Removing an absent slot is not an error.
    fn remove(&self) -> Result<(), SlotError>;
}

impl<S: DurableSlot + ?Sized> DurableSlot for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn load(&self) -> Result<Option<Vec<u8>>, SlotError> {
        (**self).load()
    }

    fn store(&self, data: &[u8]) -> Result<(), SlotError> {
        (**self).store(data)
    }

    fn remove(&self) -> Result<(), SlotError> {
        (**self).remove()
    }
}

/// In-process slot. Clones share the same bytes, so a cache rebuilt over a
/// clone sees what the previous instance wrote.
#[derive(Debug, Clone)]
pub struct MemorySlot {
    name: String,
    data: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemorySlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Arc::new(Mutex::new(None)),
        }
    }

    /// Overwrite the raw bytes, bypassing any codec.
    pub fn put_raw(&self, data: Vec<u8>) {
        *self.data.lock() = Some(data);
    }

    pub fn raw(&self) -> Option<Vec<u8>> {
        self.data.lock().clone()
    }

    pub fn is_present(&self) -> bool {
        self.data.lock().is_some()
    }
}

impl DurableSlot for MemorySlot {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Option<Vec<u8>>, SlotError> {
        Ok(self.raw())
    }

    fn store(&self, data: &[u8]) -> Result<(), SlotError> {
        self.put_raw(data.to_vec());
        Ok(())
    }

    fn remove(&self) -> Result<(), SlotError> {
        *self.data.lock() = None;
        Ok(())
    }
}
