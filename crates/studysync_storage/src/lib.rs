//! # studysync storage
//!
//! Byte-store backends underneath the studysync record log.
//!
//! Backends are **opaque byte stores**: they append, read back, flush and
//! atomically rewrite bytes without knowing anything about the frames the
//! record log puts in them.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - for tests and throwaway stores
//! - [`FileBackend`] - one file per record log, with crash-safe rewrite
//!
//! ## Example
//!
//! ```rust
//! use studysync_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"frame").unwrap();
//! assert_eq!(backend.read_at(offset, 5).unwrap(), b"frame");
//!
//! backend.rewrite(b"snapshot").unwrap();
//! assert_eq!(backend.read_all().unwrap(), b"snapshot");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
