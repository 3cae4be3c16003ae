//! # studysync testkit
//!
//! Test utilities for studysync.
//!
//! This crate provides:
//! - Store fixtures backed by temporary directories
//! - Property-based record generators using proptest
//! - Scenario helpers that build deterministic record sets
//! - A storage backend with injectable write failures
//!
//! ## Usage
//!
//! ```rust
//! use studysync_testkit::prelude::*;
//! use studysync_store::Collection;
//!
//! let store = TestStore::file();
//! store.put_batch(Collection::History, numbered_records("h", 150)).unwrap();
//! assert_eq!(store.count(Collection::History).unwrap(), 150);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::scenarios::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
