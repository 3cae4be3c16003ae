//! Property-based test generators using proptest.

use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashMap;
use studysync_store::Record;

/// Strategy for record ids drawn from a small pool, so collisions happen.
pub fn record_id_strategy(pool: usize) -> impl Strategy<Value = String> {
    (0..pool.max(1)).prop_map(|i| format!("r{i}"))
}

/// Strategy for a flat JSON payload.
pub fn payload_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(
        "[a-z]{1,8}".prop_filter("reserved key", |k| k != "id" && k != "timestamp"),
        prop_oneof![
            any::<i32>().prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            "[ -~]{0,24}".prop_map(Value::from),
        ],
        0..4,
    )
    .prop_map(|fields| fields.into_iter().collect())
}

/// Strategy for a single record with an id from a pool of `pool` ids.
///
/// Timestamps come from a narrow range so equal timestamps are common.
pub fn record_strategy(pool: usize) -> impl Strategy<Value = Record> {
    (record_id_strategy(pool), 0i64..500, payload_strategy()).prop_map(|(id, timestamp, fields)| {
        Record {
            id,
            timestamp,
            fields,
        }
    })
}

/// Strategy for a record set with unique ids, up to `max` records.
pub fn record_set_strategy(max: usize) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(record_strategy(max * 2), 0..=max).prop_map(dedupe)
}

/// Strategy for a (local, remote) pair whose ids partly overlap.
pub fn overlapping_sets_strategy(max: usize) -> impl Strategy<Value = (Vec<Record>, Vec<Record>)> {
    (record_set_strategy(max), record_set_strategy(max))
}

/// Keeps the last record for each id.
pub fn dedupe(records: Vec<Record>) -> Vec<Record> {
    let mut by_id: HashMap<String, Record> = HashMap::with_capacity(records.len());
    for record in records {
        by_id.insert(record.id.clone(), record);
    }
    by_id.into_values().collect()
}
