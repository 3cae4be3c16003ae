//! # studysync sync protocol
//!
//! Documents and rules shared by everything that reads or writes the
//! remote copy of a collection.
//!
//! This crate provides:
//! - [`PagedData`] and [`PageIndex`], the JSON files kept on the remote
//! - [`paginate`], which cuts a record set into [`PAGE_SIZE`] pages
//! - [`merge`], the local-wins union of two record sets
//! - [`RemoteLayout`], the path convention for those files
//!
//! This is a pure crate with no I/O operations.
//!
//! ## Example
//!
//! ```rust
//! use studysync_store::Record;
//! use studysync_sync_protocol::{merge, paginate};
//!
//! let local = vec![Record::with_id("a", 2)];
//! let remote = vec![Record::with_id("b", 1)];
//!
//! let out = paginate(merge(local, remote), 1_700_000_000_000);
//! assert_eq!(out.index.total_pages, 1);
//! assert_eq!(out.pages[0].records[0].id, "a");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod layout;
mod merge;
mod page;
mod paginate;
mod record;

pub use error::{ProtocolError, ProtocolResult};
pub use layout::{RemoteLayout, DEFAULT_ROOT};
pub use merge::{fits_single_page, merge};
pub use page::{PageEntry, PageIndex, PagedData, INDEX_VERSION, PAGE_SIZE};
pub use paginate::{flatten, paginate, paginate_with_size, Paginated};
pub use record::{newest_first, PageRecord};
