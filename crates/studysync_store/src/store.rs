//! Local store facade.

use crate::config::StoreConfig;
use crate::dir::StoreDir;
use crate::error::{StoreError, StoreResult};
use crate::log::{LogOp, RecordLog};
use crate::record::{newest_first_order, Collection, Record};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use studysync_storage::{FileBackend, InMemoryBackend, StorageBackend};

fn newest_first(a: &Record, b: &Record) -> Ordering {
    newest_first_order((a.timestamp, a.id.as_str()), (b.timestamp, b.id.as_str()))
}

/// One collection: its log plus the live records rebuilt from it.
///
/// The write lock on `records` is held across the log append, which
/// serializes mutations of the collection.
struct CollectionStore {
    log: RecordLog,
    records: RwLock<HashMap<String, Record>>,
}

impl CollectionStore {
    fn open(
        collection: Collection,
        backend: Box<dyn StorageBackend>,
        sync_on_write: bool,
    ) -> StoreResult<Self> {
        let log = RecordLog::new(backend, sync_on_write);
        let recovered = log.recover()?;
        tracing::debug!(
            %collection,
            frames = recovered.frames,
            records = recovered.records.len(),
            "record log replayed"
        );

        Ok(Self {
            log,
            records: RwLock::new(recovered.records),
        })
    }

    fn put(&self, record: Record) -> StoreResult<()> {
        let mut records = self.records.write();
        let op = LogOp::Put(record);
        self.log.append(&op)?;
        if let LogOp::Put(record) = op {
            records.insert(record.id.clone(), record);
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut records = self.records.write();
        if !records.contains_key(id) {
            return Ok(false);
        }
        self.log.append(&LogOp::Delete(id.to_string()))?;
        records.remove(id);
        Ok(true)
    }

    fn sorted(&self) -> Vec<Record> {
        ordered(&self.records.read())
    }

    fn replace(&self, snapshot: HashMap<String, Record>) -> StoreResult<()> {
        let mut records = self.records.write();
        self.log.rewrite(&ordered(&snapshot))?;
        *records = snapshot;
        Ok(())
    }

    fn compact(&self) -> StoreResult<()> {
        let records = self.records.write();
        self.log.rewrite(&ordered(&records))
    }
}

fn ordered(records: &HashMap<String, Record>) -> Vec<Record> {
    let mut all: Vec<Record> = records.values().cloned().collect();
    all.sort_by(newest_first);
    all
}

fn snapshot_of(records: Vec<Record>) -> StoreResult<HashMap<String, Record>> {
    let mut snapshot = HashMap::with_capacity(records.len());
    for record in records {
        validate(&record)?;
        snapshot.insert(record.id.clone(), record);
    }
    Ok(snapshot)
}

/// The local record store.
///
/// `LocalStore` holds both collections. Each collection is an append-only
/// record log replayed into memory on open; reads are served from memory.
///
/// Construct one per application and share it by reference (typically an
/// `Arc<LocalStore>`); there is no global instance.
///
/// # Opening
///
/// ```rust,no_run
/// use studysync_store::{Collection, LocalStore, Record};
/// use std::path::Path;
///
/// let store = LocalStore::open(Path::new("studysync-data"))?;
/// store.put(Collection::Notebook, Record::with_id("n1", 1_700_000_000_000))?;
/// store.close()?;
/// # Ok::<(), studysync_store::StoreError>(())
/// ```
///
/// A failed open returns no store, so nothing can run until the caller
/// opens again successfully. After [`LocalStore::close`] every operation
/// fails with [`StoreError::Closed`].
pub struct LocalStore {
    config: StoreConfig,
    dir: Option<StoreDir>,
    history: CollectionStore,
    notebook: CollectionStore,
    is_open: RwLock<bool>,
}

impl LocalStore {
    /// Opens (or creates) a store directory with default configuration.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Locked`] if another process has the store open
    /// - [`StoreError::Corrupted`] / [`StoreError::ChecksumMismatch`] if a
    ///   record log is damaged
    /// - I/O errors
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Opens a store directory with custom configuration.
    pub fn open_with_config(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        let dir = StoreDir::open(path, config.create_if_missing)?;

        let history = FileBackend::open(&dir.log_path(Collection::History))?;
        let notebook = FileBackend::open(&dir.log_path(Collection::Notebook))?;

        let mut store = Self::open_with_backends(config, Box::new(history), Box::new(notebook))?;
        tracing::info!(
            path = %path.display(),
            history = store.history.records.read().len(),
            notebook = store.notebook.records.read().len(),
            "local store opened"
        );
        store.dir = Some(dir);
        Ok(store)
    }

    /// Opens a store over pre-configured backends.
    ///
    /// Lower-level constructor; prefer [`LocalStore::open`].
    pub fn open_with_backends(
        config: StoreConfig,
        history_backend: Box<dyn StorageBackend>,
        notebook_backend: Box<dyn StorageBackend>,
    ) -> StoreResult<Self> {
        let history =
            CollectionStore::open(Collection::History, history_backend, config.sync_on_write)?;
        let notebook =
            CollectionStore::open(Collection::Notebook, notebook_backend, config.sync_on_write)?;

        Ok(Self {
            config,
            dir: None,
            history,
            notebook,
            is_open: RwLock::new(true),
        })
    }

    /// Opens a fresh non-persistent store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open_with_backends(
            StoreConfig::default(),
            Box::new(InMemoryBackend::new()),
            Box::new(InMemoryBackend::new()),
        )
    }

    fn collection(&self, collection: Collection) -> StoreResult<&CollectionStore> {
        self.ensure_open()?;
        Ok(match collection {
            Collection::History => &self.history,
            Collection::Notebook => &self.notebook,
        })
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(StoreError::Closed)
        }
    }

    /// Inserts or replaces a record by id.
    ///
    /// The write is durable when this returns; on error the collection is
    /// unchanged.
    pub fn put(&self, collection: Collection, record: Record) -> StoreResult<()> {
        validate(&record)?;
        self.collection(collection)?.put(record)
    }

    /// Upserts several records, one durable write each.
    ///
    /// Not atomic as a whole: if a write fails, the records before it stay
    /// stored and the error is returned. Returns the number stored.
    pub fn put_batch<I>(&self, collection: Collection, records: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = Record>,
    {
        let store = self.collection(collection)?;
        let mut stored = 0;
        for record in records {
            validate(&record)?;
            store.put(record)?;
            stored += 1;
        }
        Ok(stored)
    }

    /// Gets a record by id.
    pub fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Record>> {
        Ok(self.collection(collection)?.records.read().get(id).cloned())
    }

    /// Returns every record, newest first.
    pub fn get_all(&self, collection: Collection) -> StoreResult<Vec<Record>> {
        Ok(self.collection(collection)?.sorted())
    }

    /// Returns `get_all()[offset..offset + limit]`, clamped to the collection.
    pub fn get_paged(
        &self,
        collection: Collection,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<Record>> {
        let all = self.collection(collection)?.sorted();
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    /// Deletes a record. Returns whether it existed.
    ///
    /// Local only: the remote copy disappears on the next repagination
    /// that no longer includes it.
    pub fn delete(&self, collection: Collection, id: &str) -> StoreResult<bool> {
        self.collection(collection)?.delete(id)
    }

    /// Number of records in the collection.
    pub fn count(&self, collection: Collection) -> StoreResult<usize> {
        Ok(self.collection(collection)?.records.read().len())
    }

    /// Replaces the whole collection with `records`.
    ///
    /// Used after a full sync. The new contents are written as a single
    /// snapshot that replaces the log atomically; duplicate ids keep the
    /// last occurrence.
    pub fn replace_all(&self, collection: Collection, records: Vec<Record>) -> StoreResult<()> {
        let store = self.collection(collection)?;
        let snapshot = snapshot_of(records)?;
        tracing::debug!(%collection, records = snapshot.len(), "replacing collection");
        store.replace(snapshot)
    }

    /// Replaces both collections, or neither.
    ///
    /// Readers see the old contents of both until both new logs are in
    /// place. If the notebook log cannot be written, the history log is
    /// rewritten back to its current contents and the error is returned.
    pub fn replace_collections(
        &self,
        history: Vec<Record>,
        notebook: Vec<Record>,
    ) -> StoreResult<()> {
        self.ensure_open()?;
        let history = snapshot_of(history)?;
        let notebook = snapshot_of(notebook)?;

        let mut history_records = self.history.records.write();
        let mut notebook_records = self.notebook.records.write();

        self.history.log.rewrite(&ordered(&history))?;
        if let Err(e) = self.notebook.log.rewrite(&ordered(&notebook)) {
            if let Err(restore) = self.history.log.rewrite(&ordered(&history_records)) {
                tracing::error!(
                    error = %restore,
                    "failed to restore history log after a failed notebook replace"
                );
            }
            return Err(e);
        }

        tracing::debug!(
            history = history.len(),
            notebook = notebook.len(),
            "replaced both collections"
        );
        *history_records = history;
        *notebook_records = notebook;
        Ok(())
    }

    /// Rewrites the collection's log as a single snapshot frame.
    pub fn compact(&self, collection: Collection) -> StoreResult<()> {
        let store = self.collection(collection)?;
        let before = store.log.size()?;
        store.compact()?;
        tracing::debug!(%collection, before, after = store.log.size()?, "record log compacted");
        Ok(())
    }

    /// Size in bytes of the collection's record log.
    pub fn log_size(&self, collection: Collection) -> StoreResult<u64> {
        self.collection(collection)?.log.size()
    }

    /// Flushes both logs and closes the store.
    pub fn close(&self) -> StoreResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }

        self.history.log.flush()?;
        self.notebook.log.flush()?;

        *is_open = false;
        Ok(())
    }

    /// Checks if the store is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    /// Directory of a file-backed store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(StoreDir::path)
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

fn validate(record: &Record) -> StoreResult<()> {
    if record.id.is_empty() {
        return Err(StoreError::InvalidRecord("record id must not be empty".into()));
    }
    Ok(())
}
