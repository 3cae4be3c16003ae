//! Property tests for pagination and merge.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use studysync_store::Record;
use studysync_sync_protocol::{flatten, merge, paginate, PagedData, PageIndex, PAGE_SIZE};
use studysync_testkit::prelude::*;

fn by_id(records: &[Record]) -> HashMap<&str, &Record> {
    records.iter().map(|r| (r.id.as_str(), r)).collect()
}

proptest! {
    #[test]
    fn merge_is_union_of_ids((local, remote) in overlapping_sets_strategy(120)) {
        let expected: HashSet<String> = local
            .iter()
            .chain(remote.iter())
            .map(|r| r.id.clone())
            .collect();

        let merged = merge(local, remote);
        let ids: HashSet<String> = merged.iter().map(|r| r.id.clone()).collect();

        prop_assert_eq!(ids.len(), merged.len());
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn merge_keeps_local_copy((local, remote) in overlapping_sets_strategy(120)) {
        let merged = merge(local.clone(), remote);
        let merged = by_id(&merged);

        for record in &local {
            prop_assert_eq!(merged[record.id.as_str()], record);
        }
    }

    #[test]
    fn page_counts_add_up(records in record_set_strategy(450), now in any::<i64>()) {
        let n = records.len();
        let out = paginate(records, now);

        prop_assert_eq!(out.index.total_pages, n.div_ceil(PAGE_SIZE));
        prop_assert_eq!(out.index.total_records, n);
        prop_assert_eq!(out.index.pages.iter().map(|p| p.record_count).sum::<usize>(), n);
        prop_assert_eq!(out.pages.len(), out.index.total_pages);
        prop_assert!(out.index.is_consistent());
        for (i, page) in out.pages.iter().enumerate() {
            prop_assert_eq!(page.page_number as usize, i);
            prop_assert!(page.records.len() <= PAGE_SIZE);
        }
    }

    #[test]
    fn pages_are_newest_first(records in record_set_strategy(350)) {
        let out = paginate(records, 0);

        let flat: Vec<&Record> = out.pages.iter().flat_map(|p| p.records.iter()).collect();
        for pair in flat.windows(2) {
            prop_assert!(pair[0].timestamp >= pair[1].timestamp);
        }
        for pair in out.pages.windows(2) {
            let older_max = pair[1].records.iter().map(|r| r.timestamp).max();
            let newer_min = pair[0].records.iter().map(|r| r.timestamp).min();
            prop_assert!(newer_min >= older_max);
        }
    }

    #[test]
    fn pages_round_trip_through_json(records in record_set_strategy(300)) {
        let out = paginate(records.clone(), 42);

        let index = PageIndex::from_json(&out.index.to_json().unwrap()).unwrap();
        let mut downloaded = Vec::new();
        for number in index.page_numbers() {
            let bytes = out.pages[number as usize].to_json().unwrap();
            downloaded.push(PagedData::<Record>::from_json_expecting(&bytes, number).unwrap());
        }
        let restored = flatten(downloaded);

        prop_assert_eq!(restored.len(), records.len());
        let restored = by_id(&restored);
        for record in &records {
            prop_assert_eq!(restored[record.id.as_str()], record);
        }
    }

    #[test]
    fn same_set_encodes_identically(records in record_set_strategy(250)) {
        let mut shuffled = records.clone();
        shuffled.reverse();

        let a = paginate(records, 9);
        let b = paginate(shuffled, 9);

        prop_assert_eq!(a.index.to_json().unwrap(), b.index.to_json().unwrap());
        for (x, y) in a.pages.iter().zip(&b.pages) {
            prop_assert_eq!(x.to_json().unwrap(), y.to_json().unwrap());
        }
    }
}

#[test]
fn boundary_at_exactly_one_hundred() {
    let out = paginate(numbered_records("h", 100), 0);
    assert_eq!(out.index.total_pages, 1);

    let out = paginate(numbered_records("h", 200), 0);
    assert_eq!(out.index.total_pages, 2);
    let page0_min = out.pages[0].records.iter().map(|r| r.timestamp).min();
    let page1_max = out.pages[1].records.iter().map(|r| r.timestamp).max();
    assert!(page0_min > page1_max);
}

#[test]
fn large_collection_round_trips() {
    let records = numbered_records("n", 3_000);
    let out = paginate(records.clone(), 0);
    assert_eq!(out.index.total_pages, 30);
    assert_eq!(flatten(out.pages).len(), records.len());
}
