//! Splitting a record set into pages.

use crate::page::{PageEntry, PageIndex, PagedData, INDEX_VERSION, PAGE_SIZE};
use crate::record::{newest_first, PageRecord};

/// Pages and the index describing them.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<R> {
    /// Pages in order, page 0 newest.
    pub pages: Vec<PagedData<R>>,
    /// Index for exactly these pages.
    pub index: PageIndex,
}

/// Sorts `records` newest first and cuts them into [`PAGE_SIZE`] pages.
///
/// `now` stamps `lastSyncTime` and every page's `lastModified`. The page
/// contents depend only on the input set, so the same set and the same
/// `now` always produce identical output. An empty set yields no pages and
/// an index with `totalPages == 0`.
pub fn paginate<R: PageRecord>(records: Vec<R>, now: i64) -> Paginated<R> {
    paginate_with_size(records, PAGE_SIZE, now)
}

/// [`paginate`] with a custom page capacity.
///
/// # Panics
///
/// Panics if `page_size` is zero.
pub fn paginate_with_size<R: PageRecord>(
    mut records: Vec<R>,
    page_size: usize,
    now: i64,
) -> Paginated<R> {
    assert!(page_size > 0, "page size must be positive");
    records.sort_by(newest_first);

    let total_records = records.len();
    let mut pages = Vec::with_capacity(total_records.div_ceil(page_size));
    let mut iter = records.into_iter().peekable();
    let mut page_number = 0u32;
    while iter.peek().is_some() {
        let chunk: Vec<R> = iter.by_ref().take(page_size).collect();
        pages.push(PagedData {
            page_number,
            records: chunk,
        });
        page_number += 1;
    }

    let entries = pages
        .iter()
        .map(|page| PageEntry {
            page_number: page.page_number,
            record_count: page.records.len(),
            last_modified: now,
        })
        .collect();

    let index = PageIndex {
        version: INDEX_VERSION,
        total_records,
        page_size,
        total_pages: pages.len(),
        last_sync_time: now,
        pages: entries,
    };

    Paginated { pages, index }
}

/// Concatenates pages back into one record list.
pub fn flatten<R>(pages: impl IntoIterator<Item = PagedData<R>>) -> Vec<R> {
    pages.into_iter().flat_map(|page| page.records).collect()
}
