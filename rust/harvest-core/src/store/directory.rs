// rust/harvest-core/src/store/directory.rs

//! Directory-backed store.
//!
//! Each key is a file below a shared base directory: `"worker0/loss"` lives
//! at `<base>/worker0/loss`. Producers publish with [`DirectoryStore::put`],
//! which writes to a temporary sibling and renames it into place so readers
//! never observe a partially written value.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use super::traits::MetricStore;
use crate::config::StoreConfig;
use crate::error::{HarvestError, Result};

pub struct DirectoryStore {
    /// Base path for all keys.
    base_path: PathBuf,
}

impl DirectoryStore {
    /// Creates a new `DirectoryStore` rooted at `store.base_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base path cannot be created.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        Self::open(&config.base_path)
    }

    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                HarvestError::io_with_source(&base_path, "failed to create base directory", e)
            })?;
        }

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolves a key to its file, refusing keys that would leave the base
    /// directory.
    fn resolve_key(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let is_plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

        if key.is_empty() || !is_plain {
            return Err(HarvestError::store(key, "key does not map to a relative path"));
        }

        Ok(self.base_path.join(relative))
    }

    /// Publishes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the file cannot be written.
    pub fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let full_path = self.resolve_key(key)?;
        let parent = full_path
            .parent()
            .ok_or_else(|| HarvestError::store(key, "key has no parent directory"))?;

        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                HarvestError::io_with_source(parent, "failed to create parent directories", e)
            })?;
        }

        let file_name = full_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| HarvestError::store(key, "key has no file name"))?;
        let temp_path = parent.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

        let mut file = fs::File::create(&temp_path).map_err(|e| {
            HarvestError::io_with_source(&temp_path, "failed to create temp file", e)
        })?;
        file.write_all(value)
            .and_then(|_| file.sync_all())
            .map_err(|e| HarvestError::io_with_source(&temp_path, "failed to write value", e))?;
        drop(file);

        fs::rename(&temp_path, &full_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            HarvestError::io_with_source(
                &temp_path,
                format!("failed to rename to {}", full_path.display()),
                e,
            )
        })
    }

    /// Removes the value under `key`. Removing a missing key is not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        let full_path = self.resolve_key(key)?;
        match fs::remove_file(&full_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HarvestError::io_with_source(&full_path, "failed to remove value", e)),
        }
    }
}

impl MetricStore for DirectoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let full_path = self.resolve_key(key)?;

        match fs::read(&full_path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HarvestError::store_with_source(
                key,
                format!("failed to read {}", full_path.display()),
                e,
            )),
        }
    }
}
