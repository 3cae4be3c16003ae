//! Record and collection types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// The two record collections studysync keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Session history entries.
    History,
    /// Mistake notebook entries.
    Notebook,
}

impl Collection {
    /// Both collections, in sync order.
    pub const ALL: [Collection; 2] = [Collection::History, Collection::Notebook];

    /// Returns the stable name used for log files and remote folders.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Collection::History => "history",
            Collection::Notebook => "notebook",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted unit of learning data.
///
/// Only `id` and `timestamp` carry meaning here; everything else the
/// application stores is kept verbatim in `fields` and flattened into the
/// same JSON object on the wire:
///
/// ```json
/// {"id": "2b9c...", "timestamp": 1700000000000, "question": "...", "score": 3}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Globally unique identifier.
    pub id: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Application payload.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Creates a record with a freshly generated random id.
    #[must_use]
    pub fn new(timestamp: i64, fields: Map<String, Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            fields,
        }
    }

    /// Creates an empty-payload record with a caller-chosen id.
    #[must_use]
    pub fn with_id(id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            timestamp,
            fields: Map::new(),
        }
    }

    /// Adds a payload field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns a payload field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Collection order for `(timestamp, id)` pairs: newest first, equal
/// timestamps by ascending id.
///
/// Local reads and remote pages both sort with this, so the order is stable
/// across calls and identical on every device.
pub fn newest_first_order(a: (i64, &str), b: (i64, &str)) -> Ordering {
    b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collection_names() {
        assert_eq!(Collection::History.as_str(), "history");
        assert_eq!(Collection::Notebook.to_string(), "notebook");
        assert_eq!(Collection::ALL.len(), 2);
    }

    #[test]
    fn new_records_get_distinct_ids() {
        let a = Record::new(1, Map::new());
        let b = Record::new(1, Map::new());
        assert_ne!(a.id, b.id);
        assert!(!a.id.is_empty());
    }

    #[test]
    fn payload_is_flattened_in_json() {
        let record = Record::with_id("h1", 42)
            .with_field("question", "2 + 2")
            .with_field("score", 3);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"id": "h1", "timestamp": 42, "question": "2 + 2", "score": 3})
        );

        let back: Record = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.field("score"), Some(&json!(3)));
    }

    #[test]
    fn missing_mandatory_fields_are_rejected() {
        assert!(serde_json::from_value::<Record>(json!({"id": "x"})).is_err());
        assert!(serde_json::from_value::<Record>(json!({"timestamp": 1})).is_err());
    }

    #[test]
    fn order_is_newest_first_then_by_id() {
        assert_eq!(newest_first_order((5, "a"), (3, "a")), Ordering::Less);
        assert_eq!(newest_first_order((3, "a"), (5, "a")), Ordering::Greater);
        assert_eq!(newest_first_order((5, "a"), (5, "b")), Ordering::Less);
        assert_eq!(newest_first_order((5, "b"), (5, "b")), Ordering::Equal);
    }
}
