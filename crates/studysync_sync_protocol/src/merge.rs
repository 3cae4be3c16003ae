//! Local-wins merge of two record sets.

use crate::page::PAGE_SIZE;
use crate::record::{newest_first, PageRecord};
use std::collections::HashMap;

/// Merges `remote` and `local` by id, keeping the local copy on collision.
///
/// Remote records go into the map first and local records overwrite them.
/// The record timestamps are not consulted, so an older local edit
/// replaces a newer remote one, and a record deleted locally but still
/// present remotely comes back. Callers that care about either must
/// resolve it before merging.
///
/// The result is in page order (newest first).
pub fn merge<R: PageRecord>(local: Vec<R>, remote: Vec<R>) -> Vec<R> {
    let mut by_id: HashMap<String, R> = HashMap::with_capacity(local.len() + remote.len());
    for record in remote {
        by_id.insert(record.id().to_owned(), record);
    }
    for record in local {
        by_id.insert(record.id().to_owned(), record);
    }

    let mut merged: Vec<R> = by_id.into_values().collect();
    merged.sort_by(newest_first);
    merged
}

/// Whether `count` records fit on a single page.
#[must_use]
pub const fn fits_single_page(count: usize) -> bool {
    count <= PAGE_SIZE
}
