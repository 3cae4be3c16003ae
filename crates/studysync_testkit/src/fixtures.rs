//! Test fixtures and store helpers.

use std::path::Path;
use std::sync::Arc;
use studysync_store::{LocalStore, StoreConfig};
use tempfile::TempDir;

/// A test store with automatic cleanup.
///
/// Derefs to the shared [`LocalStore`]; [`TestStore::shared`] hands out the
/// `Arc` a sync coordinator takes.
pub struct TestStore {
    store: Arc<LocalStore>,
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self {
            store: Arc::new(LocalStore::open_in_memory().expect("failed to open in-memory store")),
            _temp_dir: None,
        }
    }

    /// Creates a new store in a fresh temporary directory.
    ///
    /// fsync is off; these stores never outlive the test.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let config = StoreConfig::default().sync_on_write(false);
        let store = LocalStore::open_with_config(temp_dir.path(), config)
            .expect("failed to open file store");

        Self {
            store: Arc::new(store),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }

    /// Returns a shared handle to the store.
    pub fn shared(&self) -> Arc<LocalStore> {
        Arc::clone(&self.store)
    }
}

impl std::ops::Deref for TestStore {
    type Target = LocalStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&LocalStore) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use studysync_store::{Collection, Record};

    /// Base timestamp for generated records, 2023-11-14T22:13:20Z.
    pub const BASE_TIMESTAMP: i64 = 1_700_000_000_000;

    /// Records `{prefix}1..={prefix}{count}` with distinct timestamps.
    ///
    /// Record `i` is `i` seconds after [`BASE_TIMESTAMP`], so the highest
    /// number is the newest.
    pub fn numbered_records(prefix: &str, count: usize) -> Vec<Record> {
        numbered_records_from(prefix, 1, count)
    }

    /// Like [`numbered_records`] but numbering starts at `first`.
    pub fn numbered_records_from(prefix: &str, first: usize, count: usize) -> Vec<Record> {
        (first..first + count)
            .map(|i| {
                Record::with_id(format!("{prefix}{i}"), BASE_TIMESTAMP + i as i64 * 1_000)
                    .with_field("question", format!("question {i}"))
                    .with_field("score", serde_json::json!(i % 5))
            })
            .collect()
    }

    /// Creates a store pre-populated with numbered records.
    pub fn populated_store(history: usize, notebook: usize) -> TestStore {
        let test_store = TestStore::memory();
        test_store
            .put_batch(Collection::History, numbered_records("h", history))
            .expect("failed to populate history");
        test_store
            .put_batch(Collection::Notebook, numbered_records("n", notebook))
            .expect("failed to populate notebook");
        test_store
    }
}

#[cfg(test)]
mod tests {
    use super::scenarios::*;
    use super::*;
    use studysync_store::Collection;

    #[test]
    fn memory_store_has_no_path() {
        let store = TestStore::memory();
        assert!(store.path().is_none());
        assert!(store.is_open());
    }

    #[test]
    fn file_store_lives_in_temp_dir() {
        let store = TestStore::file();
        let path = store.path().unwrap().to_path_buf();
        assert!(path.join("LOCK").exists());
        drop(store);
        assert!(!path.exists());
    }

    #[test]
    fn numbered_records_newest_is_highest() {
        let records = numbered_records("h", 3);
        assert_eq!(records[0].id, "h1");
        assert!(records[2].timestamp > records[0].timestamp);
    }

    #[test]
    fn populated_scenario() {
        let store = populated_store(12, 3);
        assert_eq!(store.count(Collection::History).unwrap(), 12);
        assert_eq!(store.count(Collection::Notebook).unwrap(), 3);
        with_temp_store(|s| assert_eq!(s.count(Collection::History).unwrap(), 0));
    }
}
