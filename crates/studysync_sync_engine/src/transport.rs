//! Remote file store abstraction.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

/// A directory/file oriented remote store.
///
/// Paths are relative to the store's base URL and use `/` separators.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Creates a directory. An existing directory is success.
    async fn ensure_directory(&self, path: &str) -> SyncResult<()>;

    /// Reads a whole file. A missing file is `Ok(None)`.
    async fn get_file(&self, path: &str) -> SyncResult<Option<Bytes>>;

    /// Replaces a whole file.
    async fn put_file(&self, path: &str, body: Bytes) -> SyncResult<()>;

    /// Checks the server is reachable and accepts the credentials.
    async fn probe(&self) -> bool;
}

/// A request seen by [`MemoryRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRequest {
    /// `probe`
    Probe,
    /// `ensure_directory(path)`
    EnsureDirectory(String),
    /// `get_file(path)`
    Get(String),
    /// `put_file(path, _)`
    Put(String),
}

/// An in-process remote for tests.
///
/// Every request is logged. Failures can be injected with
/// [`MemoryRemote::set_offline`] and [`MemoryRemote::fail_puts_after`].
#[derive(Debug, Default)]
pub struct MemoryRemote {
    files: Mutex<BTreeMap<String, Bytes>>,
    directories: Mutex<BTreeSet<String>>,
    requests: Mutex<Vec<RemoteRequest>>,
    offline: AtomicBool,
    puts_allowed: Mutex<Option<usize>>,
}

impl MemoryRemote {
    /// Creates an empty remote.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every request fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Lets the next `count` puts succeed and fails every put after them.
    pub fn fail_puts_after(&self, count: usize) {
        *self.puts_allowed.lock() = Some(count);
    }

    /// Removes injected put failures.
    pub fn clear_failures(&self) {
        *self.puts_allowed.lock() = None;
        self.set_offline(false);
    }

    /// Returns a stored file.
    pub fn file(&self, path: &str) -> Option<Bytes> {
        self.files.lock().get(path).cloned()
    }

    /// Stores a file directly, bypassing the request log.
    pub fn insert_file(&self, path: impl Into<String>, body: impl Into<Bytes>) {
        self.files.lock().insert(path.into(), body.into());
    }

    /// Paths of all stored files, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }

    /// Returns true if the directory was created.
    pub fn has_directory(&self, path: &str) -> bool {
        self.directories.lock().contains(path)
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<RemoteRequest> {
        self.requests.lock().clone()
    }

    /// Returns and clears the request log.
    pub fn take_requests(&self) -> Vec<RemoteRequest> {
        std::mem::take(&mut *self.requests.lock())
    }

    /// Paths written, in request order.
    pub fn put_paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter_map(|r| match r {
                RemoteRequest::Put(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, request: RemoteRequest) -> SyncResult<()> {
        self.requests.lock().push(request);
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::transport_retryable("remote is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteTransport for MemoryRemote {
    async fn ensure_directory(&self, path: &str) -> SyncResult<()> {
        self.record(RemoteRequest::EnsureDirectory(path.to_string()))?;
        self.directories.lock().insert(path.to_string());
        Ok(())
    }

    async fn get_file(&self, path: &str) -> SyncResult<Option<Bytes>> {
        self.record(RemoteRequest::Get(path.to_string()))?;
        Ok(self.file(path))
    }

    async fn put_file(&self, path: &str, body: Bytes) -> SyncResult<()> {
        self.record(RemoteRequest::Put(path.to_string()))?;
        {
            let mut allowed = self.puts_allowed.lock();
            match allowed.as_mut() {
                Some(0) => {
                    return Err(SyncError::Http {
                        status: 507,
                        path: path.to_string(),
                    })
                }
                Some(remaining) => *remaining -= 1,
                None => {}
            }
        }
        self.files.lock().insert(path.to_string(), body);
        Ok(())
    }

    async fn probe(&self) -> bool {
        self.record(RemoteRequest::Probe).is_ok()
    }
}
