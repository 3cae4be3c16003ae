//! # studysync store
//!
//! Durable local record store for the two studysync collections, session
//! history and the mistake notebook.
//!
//! This crate provides:
//! - [`Record`] and [`Collection`], the data model shared with the sync layer
//! - An append-only record log with CRC-checked frames and crash recovery
//! - [`LocalStore`], the facade the application and the sync engine use
//!
//! ## Example
//!
//! ```rust
//! use studysync_store::{Collection, LocalStore, Record};
//!
//! let store = LocalStore::open_in_memory().unwrap();
//! store.put(Collection::History, Record::with_id("h1", 1_700_000_000_000)).unwrap();
//!
//! assert_eq!(store.count(Collection::History).unwrap(), 1);
//! assert_eq!(store.count(Collection::Notebook).unwrap(), 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dir;
mod error;
mod log;
mod record;
mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use record::{newest_first_order, now_millis, Collection, Record};
pub use store::LocalStore;
