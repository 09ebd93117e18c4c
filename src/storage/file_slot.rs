//! File-backed durable slot.
//!
//! The slot `name` in directory `dir` lives at `<dir>/<name>.json`. Writes go
//! to a temporary file in the same directory which is then renamed over the
//! slot, so a crash mid-write leaves either the old or the new snapshot.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::PersistenceConfig;
use crate::storage::slot::{DurableSlot, SlotError};

/// A slot stored as a single file.
#[derive(Debug, Clone)]
pub struct FileSlot {
    name: String,
    dir: PathBuf,
    path: PathBuf,
}

impl FileSlot {
    /// Bind to `<dir>/<name>.json`, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self, SlotError> {
        let dir = dir.into();
        let name = name.into();
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{name}.json"));
        Ok(Self { name, dir, path })
    }

    pub fn from_config(config: &PersistenceConfig) -> Result<Self, SlotError> {
        Self::new(&config.dir, config.slot_name.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DurableSlot for FileSlot {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Option<Vec<u8>>, SlotError> {
        match fs::read(&self.path) {
            Ok(data) => {
                debug!(path = %self.path.display(), size = data.len(), "Read snapshot");
                Ok(Some(data))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, data: &[u8]) -> Result<(), SlotError> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| SlotError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        debug!(path = %self.path.display(), size = data.len(), "Wrote snapshot");
        Ok(())
    }

    fn remove(&self) -> Result<(), SlotError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Deleted snapshot");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_and_load() {
        let tmp = TempDir::new().unwrap();
        let slot = FileSlot::new(tmp.path().join("slots"), "dotnation-cache").unwrap();
        assert!(slot.load().unwrap().is_none());

        slot.store(b"{\"entries\":[],\"savedAt\":0}").unwrap();
        assert!(slot.path().ends_with("dotnation-cache.json"));
        assert_eq!(slot.load().unwrap().unwrap(), b"{\"entries\":[],\"savedAt\":0}");

        slot.store(b"second").unwrap();
        assert_eq!(slot.load().unwrap().unwrap(), b"second");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let slot = FileSlot::new(tmp.path(), "s").unwrap();
        slot.store(b"x").unwrap();
        slot.remove().unwrap();
        assert!(!slot.path().exists());
        slot.remove().unwrap();
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let tmp = TempDir::new().unwrap();
        let slot = FileSlot::new(tmp.path(), "s").unwrap();
        for i in 0..5 {
            slot.store(format!("v{i}").as_bytes()).unwrap();
        }
        let files: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}
