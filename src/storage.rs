// src/storage.rs
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

/// Fixed key the serialized workout collection lives under.
pub const STORAGE_KEY: &str = "workouts";

const APP_DATA_DIR: &str = "maptrack";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Could not determine application data directory.")]
    DataDir,
    #[error("I/O error accessing storage: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Single-key string-blob persistence, the shape of a browser's local
/// storage. Implementations must treat a missing key as `Ok(None)`.
pub trait KeyValueStore {
    /// # Errors
    /// `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Full overwrite of the value under `key`.
    /// # Errors
    /// `StorageError` if the backend cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing an absent key is not an error.
    /// # Errors
    /// `StorageError` if the backend cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// File-backed store: one file per key under the platform data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens the store in the app's data directory, creating it on demand.
    ///
    /// # Errors
    /// `StorageError::DataDir` if the platform data directory cannot be
    /// determined, `StorageError::Io` if it cannot be created.
    pub fn open_default() -> Result<Self, StorageError> {
        let data_dir = dirs::data_dir().ok_or(StorageError::DataDir)?;
        Self::open(data_dir.join(APP_DATA_DIR))
    }

    /// Opens the store rooted at `dir`, creating it on demand.
    ///
    /// # Errors
    /// `StorageError::Io` if the directory cannot be created.
    pub fn open(dir: PathBuf) -> Result<Self, StorageError> {
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    /// Path of the file backing `key`.
    ///
    /// # Errors
    /// `StorageError::InvalidKey` for keys that would escape the store
    /// directory.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() || key.contains(['/', '\\', '.']) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::write(self.path_for(key)?, value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store for tests. Clones share the same underlying map, so a
/// fresh `App` handed a clone sees what a previous instance persisted --
/// the same way two page loads see one local storage. The whole system is
/// single-threaded (one cooperative event loop), hence `Rc`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
