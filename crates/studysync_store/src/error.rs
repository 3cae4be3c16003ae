//! Error types for the local store.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in local store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] studysync_storage::StorageError),

    /// I/O error outside the backends (directory, lock file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The record log is damaged and cannot be replayed.
    #[error("record log corrupted at offset {offset}: {message}")]
    Corrupted {
        /// Offset of the damaged frame.
        offset: u64,
        /// Description of the damage.
        message: String,
    },

    /// Frame checksum did not match its contents.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the damaged frame.
        offset: u64,
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// The record is not acceptable for storage.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The store directory does not exist and creation was not requested.
    #[error("store directory does not exist: {}", path.display())]
    MissingStore {
        /// The directory that was looked for.
        path: PathBuf,
    },

    /// Another process holds the store directory lock.
    #[error("store locked: another process has exclusive access")]
    Locked,

    /// The store has been closed.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Creates a corruption error for the frame at `offset`.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            message: message.into(),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl std::fmt::Display) -> Self {
        Self::Codec(message.to_string())
    }
}
