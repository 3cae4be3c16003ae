//! File-based storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file-based storage backend.
///
/// Each record log lives in one file. Appends go to the end of the file;
/// [`StorageBackend::rewrite`] writes a sibling `*.tmp` file, syncs it and
/// renames it over the original so a crash never leaves a half-written log.
///
/// # Durability
///
/// - `flush()` pushes data to the OS
/// - `sync()` calls `File::sync_all()`
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: RwLock<File>,
    size: RwLock<u64>,
}

impl FileBackend {
    /// Opens or creates a file backend at the given path.
    ///
    /// A leftover `*.tmp` file from an interrupted rewrite is removed; the
    /// original file is still the authoritative copy in that case.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let tmp = temp_path(path);
        if tmp.exists() {
            tracing::warn!(path = %tmp.display(), "removing leftover rewrite file");
            fs::remove_file(&tmp)?;
        }

        let file = open_rw(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            size: RwLock::new(size),
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_rw(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Makes a rename durable by syncing the parent directory. Not every
/// platform can open a directory for syncing; failure there is not fatal.
fn sync_parent_dir(path: &Path) {
    let Some(parent) = path.parent() else {
        return;
    };
    match File::open(parent).and_then(|dir| dir.sync_all()) {
        Ok(()) => {}
        Err(e) => tracing::debug!(error = %e, "parent directory sync unavailable"),
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let size = *self.size.read();
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        if len == 0 {
            return Ok(Vec::new());
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let mut file = self.file.write();
        let mut size = self.size.write();

        let offset = *size;
        if data.is_empty() {
            return Ok(offset);
        }

        file.seek(SeekFrom::End(0))?;
        if let Err(e) = file.write_all(data) {
            // Drop whatever part of `data` reached the file.
            if let Err(restore) = file.set_len(offset) {
                tracing::error!(offset, error = %restore, "failed to cut back partial append");
            }
            return Err(e.into());
        }
        *size += data.len() as u64;

        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.write().flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.write().sync_all()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(*self.size.read())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let file = self.file.write();
        let mut size = self.size.write();

        if new_size > *size {
            return Err(StorageError::TruncateBeyondEnd {
                requested: new_size,
                size: *size,
            });
        }

        file.set_len(new_size)?;
        file.sync_all()?;
        *size = new_size;

        Ok(())
    }

    fn rewrite(&mut self, data: &[u8]) -> StorageResult<()> {
        let tmp = temp_path(&self.path);
        {
            let mut staged = File::create(&tmp)?;
            staged.write_all(data)?;
            staged.sync_all()?;
        }

        let mut file = self.file.write();
        let mut size = self.size.write();

        fs::rename(&tmp, &self.path)?;
        sync_parent_dir(&self.path);

        *file = open_rw(&self.path)?;
        *size = data.len() as u64;
        Ok(())
    }
}
