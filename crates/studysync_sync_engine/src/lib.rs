//! # studysync sync engine
//!
//! Keeps the local record store and a WebDAV copy of it in step.
//!
//! This crate provides:
//! - [`RemoteTransport`], the remote file store abstraction
//! - [`WebDavClient`], its HTTP implementation, and [`MemoryRemote`] for tests
//! - [`SyncCoordinator`], which runs full syncs and incremental pushes
//! - Configuration, status and error types
//!
//! ## Remote layout
//!
//! ```text
//! {server}/{root}/history/index.json
//! {server}/{root}/history/page_0.json     newest 100 records
//! {server}/{root}/history/page_1.json     next 100
//! {server}/{root}/notebook/...
//! ```
//!
//! ## Key Invariants
//!
//! - On a record id present on both sides, the local copy wins
//! - An index is only written after every page it lists was written
//! - A failed sync never modifies the local store
//! - Nothing is retried automatically
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use studysync_store::LocalStore;
//! use studysync_sync_engine::{RemoteConfig, SyncConfig, SyncCoordinator};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(LocalStore::open(std::path::Path::new("data"))?);
//! let remote = RemoteConfig::from_settings("https://dav.example.com", "ana", "secret", true);
//! let sync = Arc::new(SyncCoordinator::from_config(store, SyncConfig::new(remote))?);
//!
//! sync.full_sync().await?;
//! // ... after each local change:
//! let _push = sync.spawn_push();
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod coordinator;
mod error;
mod push;
mod state;
mod transport;
mod webdav;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{RemoteConfig, RemoteCredentials, SyncConfig, TransportSettings, DEFAULT_PROXY_URL};
pub use coordinator::{RemoteLink, SyncCoordinator};
pub use error::{SyncError, SyncResult};
pub use push::PushHandle;
pub use state::{
    CollectionReport, PushReport, SyncOutcome, SyncPath, SyncReport, SyncState, SyncStats,
    SyncStatus,
};
pub use transport::{MemoryRemote, RemoteRequest, RemoteTransport};
pub use webdav::WebDavClient;
