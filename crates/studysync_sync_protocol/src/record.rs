//! What pagination and merge need from a record.

use std::cmp::Ordering;
use studysync_store::{newest_first_order, Record};

/// A record that can be paginated and merged.
pub trait PageRecord {
    /// Unique id within the collection.
    fn id(&self) -> &str;

    /// Creation time, epoch ms.
    fn timestamp(&self) -> i64;
}

impl PageRecord for Record {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Page order: newest first, ties broken by ascending id.
///
/// The same order [`studysync_store::LocalStore::get_all`] returns.
pub fn newest_first<R: PageRecord>(a: &R, b: &R) -> Ordering {
    newest_first_order((a.timestamp(), a.id()), (b.timestamp(), b.id()))
}
