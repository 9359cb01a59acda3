//! Atomic TOML file operations.
//!
//! Provides a thin layer for safe concurrent access to TOML documents:
//! tmp file + fsync + atomic rename for durability, an exclusive file lock
//! for isolated read-modify-write updates.

use fs2::FileExt;
use iris_core::error::{IrisError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A handle to an atomically updated TOML file.
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a new handle. The file itself may not exist yet.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the file.
    ///
    /// Returns `Ok(None)` if the file does not exist or is empty.
    pub fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let data: T = toml::from_str(&content)?;
        Ok(Some(data))
    }

    /// Saves data atomically: serialize, write to a sibling tmp file,
    /// fsync, rename over the destination.
    pub fn save(&self, data: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(data)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(toml_string.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Read-modify-write under an exclusive file lock.
    ///
    /// The closure receives the current contents (or `default_value` when
    /// the file is absent) and its result is written back atomically.
    pub fn update<F>(&self, default_value: T, f: F) -> Result<()>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        let _lock = FileLock::acquire(&self.path)?;
        let mut data = self.load()?.unwrap_or(default_value);
        f(&mut data)?;
        self.save(&data)
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| IrisError::io("Path has no parent directory"))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| IrisError::io("Path has no file name"))?;
        let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(parent.join(tmp_name))
    }
}

/// A file lock guard that releases the lock when dropped.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        file.lock_exclusive()
            .map_err(|e| IrisError::io(format!("Failed to acquire lock: {}", e)))?;

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Unlock is automatic when the file handle is dropped; removing
        // the lock file is best effort.
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        count: u32,
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let file: AtomicTomlFile<Doc> = AtomicTomlFile::new(dir.path().join("missing.toml"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::new(dir.path().join("doc.toml"));
        let doc = Doc {
            name: "session".to_string(),
            count: 3,
        };

        file.save(&doc).unwrap();
        assert_eq!(file.load().unwrap(), Some(doc));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::new(dir.path().join("a/b/doc.toml"));
        file.save(&Doc {
            name: "nested".to_string(),
            count: 1,
        })
        .unwrap();
        assert!(file.load().unwrap().is_some());
    }

    #[test]
    fn test_update_applies_closure() {
        let dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::new(dir.path().join("doc.toml"));
        let default = Doc {
            name: "fresh".to_string(),
            count: 0,
        };

        file.update(default.clone(), |doc| {
            doc.count += 1;
            Ok(())
        })
        .unwrap();
        file.update(default, |doc| {
            doc.count += 1;
            Ok(())
        })
        .unwrap();

        assert_eq!(file.load().unwrap().unwrap().count, 2);
    }
}
