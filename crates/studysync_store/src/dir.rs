//! Store directory management.
//!
//! ```text
//! <store_path>/
//! ├─ LOCK            # Advisory lock for single-process access
//! ├─ history.log     # Record log for the history collection
//! └─ notebook.log    # Record log for the notebook collection
//! ```

use crate::error::{StoreError, StoreResult};
use crate::record::Collection;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";

/// Holds the store directory and its exclusive lock.
///
/// Only one `StoreDir` can exist per directory at a time; the lock is
/// released when the value is dropped.
#[derive(Debug)]
pub(crate) struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens or creates a store directory and takes its lock.
    ///
    /// # Errors
    ///
    /// - [`StoreError::MissingStore`] if the directory is absent and
    ///   `create_if_missing` is false
    /// - [`StoreError::Locked`] if another process holds the lock
    pub(crate) fn open(path: &Path, create_if_missing: bool) -> StoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(StoreError::MissingStore {
                    path: path.to_path_buf(),
                });
            }
        }

        if !path.is_dir() {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("store path is not a directory: {}", path.display()),
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the record log for `collection`.
    pub(crate) fn log_path(&self, collection: Collection) -> PathBuf {
        self.path.join(format!("{}.log", collection.as_str()))
    }
}
