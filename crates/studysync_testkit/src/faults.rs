//! A storage backend that fails on demand.
//!
//! [`FaultyBackend`] keeps its bytes behind a shared handle. Clone it, hand
//! one copy to a store and keep the other to switch failures on and off or
//! to reopen a store over the same bytes.

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use studysync_storage::{StorageBackend, StorageError, StorageResult};

#[derive(Debug, Default)]
struct Inner {
    data: Vec<u8>,
    tear_next_append: bool,
    fail_syncs: bool,
    fail_rewrites: bool,
}

/// In-memory backend with injectable write failures.
#[derive(Debug, Clone, Default)]
pub struct FaultyBackend {
    inner: Arc<Mutex<Inner>>,
}

impl FaultyBackend {
    /// Creates an empty backend with no failures armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// The next append writes half its bytes, then fails.
    pub fn tear_next_append(&self) {
        self.inner.lock().tear_next_append = true;
    }

    /// While set, every `sync` fails.
    pub fn fail_syncs(&self, fail: bool) {
        self.inner.lock().fail_syncs = fail;
    }

    /// While set, every `rewrite` fails without touching the bytes.
    pub fn fail_rewrites(&self, fail: bool) {
        self.inner.lock().fail_rewrites = fail;
    }

    /// Copy of the stored bytes.
    pub fn data(&self) -> Vec<u8> {
        self.inner.lock().data.clone()
    }

    /// A boxed handle over the same bytes, for `LocalStore::open_with_backends`.
    pub fn boxed(&self) -> Box<dyn StorageBackend> {
        Box::new(self.clone())
    }
}

fn injected(what: &str) -> StorageError {
    StorageError::Io(io::Error::other(format!("injected {what} failure")))
}

impl StorageBackend for FaultyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let inner = self.inner.lock();
        let size = inner.data.len() as u64;
        let start = offset as usize;
        let end = start.saturating_add(len);
        if offset > size || end > inner.data.len() {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }
        Ok(inner.data[start..end].to_vec())
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let mut inner = self.inner.lock();
        let offset = inner.data.len() as u64;
        if inner.tear_next_append {
            inner.tear_next_append = false;
            inner.data.extend_from_slice(&data[..data.len() / 2]);
            return Err(injected("append"));
        }
        inner.data.extend_from_slice(data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        if self.inner.lock().fail_syncs {
            return Err(injected("sync"));
        }
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.inner.lock().data.len() as u64)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        let size = inner.data.len() as u64;
        if new_size > size {
            return Err(StorageError::TruncateBeyondEnd {
                requested: new_size,
                size,
            });
        }
        inner.data.truncate(new_size as usize);
        Ok(())
    }

    fn rewrite(&mut self, data: &[u8]) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        if inner.fail_rewrites {
            return Err(injected("rewrite"));
        }
        inner.data = data.to_vec();
        Ok(())
    }
}
