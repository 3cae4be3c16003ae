//! Full sync between the local store and the remote.

use crate::clock::{Clock, SystemClock};
use crate::config::{RemoteConfig, SyncConfig};
use crate::error::{SyncError, SyncResult};
use crate::state::{
    CollectionReport, SyncOutcome, SyncPath, SyncReport, SyncState, SyncStats, SyncStatus,
};
use crate::transport::RemoteTransport;
use crate::webdav::WebDavClient;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use studysync_store::{Collection, LocalStore, Record};
use studysync_sync_protocol::{
    fits_single_page, flatten, merge, paginate, PageIndex, PagedData, Paginated, RemoteLayout,
};

/// Whether the coordinator may talk to a remote.
///
/// Checked once at the entry of every public operation.
#[derive(Debug, Clone)]
pub enum RemoteLink<T> {
    /// Sync is off.
    Disabled,
    /// Sync is on, through this transport.
    Connected(T),
}

impl<T> RemoteLink<T> {
    /// Returns the transport if connected.
    pub fn connected(&self) -> Option<&T> {
        match self {
            RemoteLink::Connected(transport) => Some(transport),
            RemoteLink::Disabled => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Operation {
    FullSync,
    Push,
}

#[derive(Debug, Default)]
struct StatusBook {
    full_sync: SyncState,
    push: SyncState,
    stats: SyncStats,
}

/// A collection cut into pages and encoded for upload.
pub(crate) struct EncodedCollection {
    pub(crate) pages: Vec<(String, Bytes)>,
    pub(crate) index_path: String,
    pub(crate) index: Bytes,
    pub(crate) records: Vec<Record>,
}

/// Keeps the local store and the remote copy of both collections in step.
///
/// The coordinator owns no data: it reads and replaces collections in the
/// shared [`LocalStore`] and reads and writes files through a
/// [`RemoteTransport`].
///
/// Two operations are provided:
///
/// - [`SyncCoordinator::full_sync`] pulls remote state, merges it with the
///   local state (local copy wins on id collision), uploads the result and
///   replaces the local collections with it.
/// - [`SyncCoordinator::push`] re-uploads the local state without looking
///   at the remote first. [`SyncCoordinator::spawn_push`] runs it in the
///   background after a local mutation.
///
/// Neither operation retries. A failure leaves the local store untouched
/// and may leave the remote half-written; the next full sync repairs it.
///
/// A full sync and a push started at the same time are not serialized
/// against each other.
pub struct SyncCoordinator {
    store: Arc<LocalStore>,
    link: RemoteLink<Arc<dyn RemoteTransport>>,
    layout: RemoteLayout,
    clock: Arc<dyn Clock>,
    max_concurrent: usize,
    status: RwLock<StatusBook>,
}

impl SyncCoordinator {
    /// Creates a coordinator that talks WebDAV as configured.
    ///
    /// A disabled configuration builds a coordinator whose operations
    /// return [`SyncOutcome::Disabled`].
    pub fn from_config(store: Arc<LocalStore>, config: SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        let link = match &config.remote {
            RemoteConfig::Disabled => RemoteLink::Disabled,
            RemoteConfig::Configured(credentials) => {
                let client = WebDavClient::new(credentials, &config.proxy_url, &config.transport)?;
                tracing::info!(url = client.base_url(), "remote sync enabled");
                RemoteLink::Connected(Arc::new(client) as Arc<dyn RemoteTransport>)
            }
        };
        Ok(Self::build(store, link, &config))
    }

    /// Creates a coordinator over a caller-supplied transport.
    ///
    /// The transport is always used; `config.remote` is ignored.
    pub fn with_transport(
        store: Arc<LocalStore>,
        transport: Arc<dyn RemoteTransport>,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self::build(store, RemoteLink::Connected(transport), &config))
    }

    fn build(
        store: Arc<LocalStore>,
        link: RemoteLink<Arc<dyn RemoteTransport>>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            store,
            link,
            layout: config.layout(),
            clock: Arc::new(SystemClock),
            max_concurrent: config.max_concurrent_uploads,
            status: RwLock::new(StatusBook::default()),
        }
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The local store this coordinator syncs.
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// The remote file layout.
    pub fn layout(&self) -> &RemoteLayout {
        &self.layout
    }

    /// Returns true if a remote is configured.
    pub fn is_enabled(&self) -> bool {
        self.link.connected().is_some()
    }

    /// Current state and counters.
    pub fn status(&self) -> SyncStatus {
        let book = self.status.read();
        SyncStatus {
            enabled: self.is_enabled(),
            full_sync: book.full_sync,
            push: book.push,
            stats: book.stats.clone(),
        }
    }

    /// Checks the remote is reachable with the configured credentials.
    ///
    /// Always false when sync is disabled.
    pub async fn probe(&self) -> bool {
        match self.link.connected() {
            Some(transport) => transport.probe().await,
            None => false,
        }
    }

    /// Runs a full sync of both collections.
    ///
    /// On success both local collections are replaced with the merged sets
    /// returned in the report. On failure nothing local changes.
    #[tracing::instrument(skip(self))]
    pub async fn full_sync(&self) -> SyncResult<SyncOutcome<SyncReport>> {
        let Some(transport) = self.link.connected().cloned() else {
            tracing::debug!("full sync skipped, remote disabled");
            return Ok(SyncOutcome::Disabled);
        };

        self.begin(Operation::FullSync);
        let started = Instant::now();
        tracing::info!("full sync started");

        match self.run_full_sync(transport.as_ref(), started).await {
            Ok(report) => {
                let pages = report.history.pages_uploaded + report.notebook.pages_uploaded;
                self.succeed(Operation::FullSync, pages);
                tracing::info!(
                    history = report.history.records.len(),
                    notebook = report.notebook.records.len(),
                    pages,
                    elapsed_ms = report.duration.as_millis() as u64,
                    "full sync completed"
                );
                Ok(SyncOutcome::Completed(report))
            }
            Err(e) => {
                self.fail(Operation::FullSync, &e);
                Err(e)
            }
        }
    }

    async fn run_full_sync(
        &self,
        transport: &dyn RemoteTransport,
        started: Instant,
    ) -> SyncResult<SyncReport> {
        for dir in self.layout.directories() {
            transport.ensure_directory(&dir).await?;
        }

        let history = self.sync_collection(transport, Collection::History).await?;
        let notebook = self.sync_collection(transport, Collection::Notebook).await?;

        self.store
            .replace_collections(history.records.clone(), notebook.records.clone())?;

        Ok(SyncReport {
            history,
            notebook,
            duration: started.elapsed(),
        })
    }

    async fn sync_collection(
        &self,
        transport: &dyn RemoteTransport,
        collection: Collection,
    ) -> SyncResult<CollectionReport> {
        let local = self.store.get_all(collection)?;
        let index_path = self.layout.index_path(collection);

        let Some(index_bytes) = transport.get_file(&index_path).await? else {
            tracing::info!(
                %collection,
                records = local.len(),
                "no remote index, bootstrapping"
            );
            let encoded = self.encode(collection, local)?;
            let pages_uploaded = self.upload(transport, &encoded).await?;
            return Ok(CollectionReport {
                path: SyncPath::Bootstrap,
                records: encoded.records,
                pages_uploaded,
                remote_pages_before: 0,
            });
        };

        let index = PageIndex::from_json(&index_bytes)?;
        if !index.is_consistent() {
            tracing::warn!(%collection, ?index, "remote index counts disagree");
        }
        let remote_pages_before = index.total_pages;

        let first_page = self.fetch_page(transport, collection, 0).await?;
        let merged = merge(local.clone(), first_page);

        let (path, merged) = if fits_single_page(merged.len()) {
            (SyncPath::SinglePage, merged)
        } else {
            let remote = self
                .fetch_pages(transport, collection, index.page_numbers().collect())
                .await?;
            tracing::debug!(
                %collection,
                remote = remote.len(),
                local = local.len(),
                "repaginating"
            );
            (SyncPath::Repaginated, merge(local, remote))
        };

        let encoded = self.encode(collection, merged)?;
        if encoded.pages.len() < remote_pages_before {
            tracing::warn!(
                %collection,
                stale = remote_pages_before - encoded.pages.len(),
                "remote pages beyond the new page count are left in place"
            );
        }
        let pages_uploaded = self.upload(transport, &encoded).await?;

        Ok(CollectionReport {
            path,
            records: encoded.records,
            pages_uploaded,
            remote_pages_before,
        })
    }

    /// Downloads one page. A missing page is empty.
    async fn fetch_page(
        &self,
        transport: &dyn RemoteTransport,
        collection: Collection,
        page_number: u32,
    ) -> SyncResult<Vec<Record>> {
        let path = self.layout.page_path(collection, page_number);
        match transport.get_file(&path).await? {
            Some(bytes) => {
                Ok(PagedData::<Record>::from_json_expecting(&bytes, page_number)?.records)
            }
            None => {
                tracing::debug!(%collection, page_number, "remote page missing, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Downloads the listed pages, `max_concurrent` at a time.
    async fn fetch_pages(
        &self,
        transport: &dyn RemoteTransport,
        collection: Collection,
        page_numbers: Vec<u32>,
    ) -> SyncResult<Vec<Record>> {
        let pages: Vec<SyncResult<Vec<Record>>> = stream::iter(page_numbers)
            .map(|n| self.fetch_page(transport, collection, n))
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut records = Vec::new();
        for page in pages {
            records.extend(page?);
        }
        Ok(records)
    }

    /// Paginates and serializes a record set.
    pub(crate) fn encode(
        &self,
        collection: Collection,
        records: Vec<Record>,
    ) -> SyncResult<EncodedCollection> {
        let Paginated { pages, index } = paginate(records, self.clock.now_millis());

        let mut encoded = Vec::with_capacity(pages.len());
        for page in &pages {
            let path = self.layout.page_path(collection, page.page_number);
            encoded.push((path, Bytes::from(page.to_json()?)));
        }

        Ok(EncodedCollection {
            pages: encoded,
            index_path: self.layout.index_path(collection),
            index: Bytes::from(index.to_json()?),
            records: flatten(pages),
        })
    }

    /// Uploads every page, then the index. Returns the pages written.
    ///
    /// The index is not written unless every page upload succeeded. A failed
    /// page does not abort the others: every upload runs to completion and
    /// the first error is returned afterwards.
    pub(crate) async fn upload(
        &self,
        transport: &dyn RemoteTransport,
        encoded: &EncodedCollection,
    ) -> SyncResult<usize> {
        let mut uploads = stream::iter(encoded.pages.clone())
            .map(|(path, body)| async move {
                transport.put_file(&path, body).await?;
                tracing::debug!(path = path.as_str(), "page uploaded");
                Ok::<_, SyncError>(())
            })
            .buffer_unordered(self.max_concurrent);

        let mut written = 0;
        let mut first_error = None;
        while let Some(result) = uploads.next().await {
            match result {
                Ok(()) => written += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "page upload failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        transport
            .put_file(&encoded.index_path, encoded.index.clone())
            .await?;
        Ok(written)
    }

    pub(crate) fn begin(&self, operation: Operation) {
        let mut book = self.status.write();
        match operation {
            Operation::FullSync => book.full_sync = SyncState::InProgress,
            Operation::Push => book.push = SyncState::InProgress,
        }
    }

    pub(crate) fn succeed(&self, operation: Operation, pages: usize) {
        let now = self.clock.now_millis();
        let mut book = self.status.write();
        match operation {
            Operation::FullSync => {
                book.full_sync = SyncState::Completed;
                book.stats.full_syncs_completed += 1;
            }
            Operation::Push => {
                book.push = SyncState::Completed;
                book.stats.pushes_completed += 1;
            }
        }
        book.stats.pages_uploaded += pages as u64;
        book.stats.last_success = Some(now);
    }

    pub(crate) fn fail(&self, operation: Operation, error: &SyncError) {
        tracing::error!(
            ?operation,
            %error,
            retryable = error.is_retryable(),
            "sync failed, local data unchanged"
        );
        let mut book = self.status.write();
        match operation {
            Operation::FullSync => book.full_sync = SyncState::Failed,
            Operation::Push => book.push = SyncState::Failed,
        }
        book.stats.failures += 1;
        book.stats.last_error = Some(error.to_string());
    }

    pub(crate) fn transport(&self) -> Option<Arc<dyn RemoteTransport>> {
        self.link.connected().cloned()
    }
}
