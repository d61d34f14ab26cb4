//! Durable named slots.
//!
//! A slot holds one string value, read whole and written whole. The
//! session store keeps its conversations in one slot, and settings keep
//! each preference in a slot of its own.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// The error type for slot storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend could not be accessed.
    #[error("storage i/o failed: {0}")]
    Io(#[from] io::Error),
    /// The slot name cannot be stored by this backend.
    #[error("invalid slot name: {0:?}")]
    InvalidName(String),
}

/// A backend that stores named string slots.
///
/// Writes must be synchronous: once `write_slot` returns `Ok`, a later
/// `read_slot` (even from a new process, for durable backends) must see
/// the new value.
pub trait SlotStorage: Send + Sync {
    /// Reads a slot, returning `None` if it has never been written.
    fn read_slot(&self, name: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the whole value of a slot.
    fn write_slot(&self, name: &str, value: &str) -> Result<(), StorageError>;
}

/// Slots kept in memory. Clones share the same slots.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SlotStorage for MemoryStorage {
    fn read_slot(&self, name: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots().get(name).cloned())
    }

    fn write_slot(&self, name: &str, value: &str) -> Result<(), StorageError> {
        self.slots().insert(name.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Slots kept as files in a directory, one file per slot, named after the
/// slot. Values are stored as-is.
///
/// A write goes to a temporary sibling first, is synced to disk, and is
/// then renamed over the slot file, so readers see either the old or the
/// new value in full.
#[derive(Clone, Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Creates a storage rooted at `root`. The directory is created on the
    /// first write.
    #[inline]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
            && !name.starts_with('.')
            && !name.ends_with(".tmp");
        if !valid {
            return Err(StorageError::InvalidName(name.to_owned()));
        }
        Ok(self.root.join(name))
    }
}

impl SlotStorage for FileStorage {
    fn read_slot(&self, name: &str) -> Result<Option<String>, StorageError> {
        let path = self.slot_path(name)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_slot(&self, name: &str, value: &str) -> Result<(), StorageError> {
        let path = self.slot_path(name)?;
        fs::create_dir_all(&self.root)?;
        let tmp_path = self.root.join(format!("{name}.tmp"));

        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(value.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        if let Err(err) = fs::rename(&tmp_path, &path) {
            fs::remove_file(&tmp_path).ok();
            return Err(err.into());
        }
        trace!("wrote slot {name} to {}", path.display());
        Ok(())
    }
}
