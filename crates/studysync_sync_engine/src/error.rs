//! Error types for the sync engine.

use studysync_store::StoreError;
use studysync_sync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// A missing remote file is not an error; it surfaces as `None` from
/// [`crate::RemoteTransport::get_file`].
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The server rejected the credentials.
    #[error("authentication failed for {0}")]
    Unauthorized(String),

    /// The server answered with an unexpected status.
    #[error("unexpected HTTP status {status} for {path}")]
    Http {
        /// Response status code.
        status: u16,
        /// Remote path of the request.
        path: String,
    },

    /// A remote document could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The local store failed.
    #[error("local store error: {0}")]
    Store(#[from] StoreError),

    /// A background task panicked or was aborted.
    #[error("background task failed: {0}")]
    TaskFailed(String),

    /// The configuration cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if running the same operation again may succeed.
    ///
    /// The engine never retries on its own; this is for the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Http { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }
}
