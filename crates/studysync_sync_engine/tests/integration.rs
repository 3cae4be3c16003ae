//! Integration tests for full sync and incremental push.

use std::collections::HashSet;
use std::sync::Arc;
use studysync_store::{Collection, LocalStore, Record, StoreConfig};
use studysync_sync_engine::{
    FixedClock, MemoryRemote, RemoteConfig, RemoteTransport, SyncConfig, SyncCoordinator,
    SyncError, SyncOutcome, SyncPath, SyncState,
};
use studysync_sync_protocol::{paginate, PageIndex, PagedData};
use studysync_testkit::prelude::*;

const HISTORY_INDEX: &str = "studysync/history/index.json";

fn page_path(n: u32) -> String {
    format!("studysync/history/page_{n}.json")
}

fn coordinator(store: Arc<LocalStore>, remote: &Arc<MemoryRemote>) -> SyncCoordinator {
    SyncCoordinator::with_transport(
        store,
        Arc::clone(remote) as Arc<dyn RemoteTransport>,
        SyncConfig::default(),
    )
    .unwrap()
    .with_clock(Arc::new(FixedClock::new(BASE_TIMESTAMP)))
}

fn remote_index(remote: &MemoryRemote, path: &str) -> PageIndex {
    PageIndex::from_json(&remote.file(path).expect("index present")).unwrap()
}

fn remote_page(remote: &MemoryRemote, n: u32) -> PagedData<Record> {
    PagedData::from_json_expecting(&remote.file(&page_path(n)).expect("page present"), n).unwrap()
}

/// Seeds the remote the way another device's full sync would have.
fn seed_remote(remote: &MemoryRemote, records: Vec<Record>) {
    let out = paginate(records, BASE_TIMESTAMP - 60_000);
    for page in &out.pages {
        remote.insert_file(page_path(page.page_number), page.to_json().unwrap());
    }
    remote.insert_file(HISTORY_INDEX, out.index.to_json().unwrap());
}

fn ids(records: &[Record]) -> HashSet<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

#[tokio::test]
async fn empty_local_and_absent_remote_uploads_empty_index() {
    let store = TestStore::memory();
    let remote = Arc::new(MemoryRemote::new());

    let report = coordinator(store.shared(), &remote)
        .full_sync()
        .await
        .unwrap()
        .completed()
        .unwrap();

    assert_eq!(report.history.path, SyncPath::Bootstrap);
    assert_eq!(report.history.pages_uploaded, 0);
    let index = remote_index(&remote, HISTORY_INDEX);
    assert_eq!(index.total_pages, 0);
    assert_eq!(index.total_records, 0);
    assert!(remote.file(&page_path(0)).is_none());
    assert_eq!(
        remote.paths(),
        vec![HISTORY_INDEX, "studysync/notebook/index.json"]
    );
}

#[tokio::test]
async fn bootstrap_splits_150_records_into_two_pages() {
    let store = populated_store(150, 0);
    let remote = Arc::new(MemoryRemote::new());

    let report = coordinator(store.shared(), &remote)
        .full_sync()
        .await
        .unwrap()
        .completed()
        .unwrap();

    assert_eq!(report.history.path, SyncPath::Bootstrap);
    assert_eq!(report.history.pages_uploaded, 2);

    let index = remote_index(&remote, HISTORY_INDEX);
    assert_eq!(index.total_pages, 2);
    assert_eq!(index.total_records, 150);

    let page0 = remote_page(&remote, 0);
    let page1 = remote_page(&remote, 1);
    assert_eq!(page0.records.len(), 100);
    assert_eq!(page1.records.len(), 50);
    assert_eq!(page0.records[0].id, "h150");
    assert_eq!(page0.records[99].id, "h51");
    assert_eq!(page1.records[0].id, "h50");
    assert_eq!(page1.records[49].id, "h1");
}

#[tokio::test]
async fn overflowing_first_page_triggers_repagination() {
    let store = TestStore::memory();
    store
        .put_batch(Collection::History, numbered_records_from("local", 1, 10))
        .unwrap();
    let remote = Arc::new(MemoryRemote::new());
    seed_remote(&remote, numbered_records_from("remote", 1, 95));
    remote.take_requests();

    let report = coordinator(store.shared(), &remote)
        .full_sync()
        .await
        .unwrap()
        .completed()
        .unwrap();

    assert_eq!(report.history.path, SyncPath::Repaginated);
    assert_eq!(report.history.remote_pages_before, 1);
    assert_eq!(report.history.records.len(), 105);

    let index = remote_index(&remote, HISTORY_INDEX);
    assert_eq!(index.total_pages, 2);
    assert_eq!(index.total_records, 105);
    assert_eq!(remote_page(&remote, 0).records.len(), 100);
    assert_eq!(remote_page(&remote, 1).records.len(), 5);

    assert_eq!(store.count(Collection::History).unwrap(), 105);
}

#[tokio::test]
async fn small_merge_stays_on_one_page_and_abandons_old_pages() {
    let store = TestStore::memory();
    store
        .put_batch(Collection::History, numbered_records_from("h", 500, 5))
        .unwrap();
    let remote = Arc::new(MemoryRemote::new());
    // Three remote pages, but only page 0 is read on this path.
    seed_remote(&remote, numbered_records_from("r", 1, 250));
    let stale_page = remote.file(&page_path(2)).unwrap();
    // Page 0 shrinks to a handful of records on another device.
    remote.insert_file(
        page_path(0),
        PagedData {
            page_number: 0,
            records: numbered_records_from("r", 300, 3),
        }
        .to_json()
        .unwrap(),
    );

    let report = coordinator(store.shared(), &remote)
        .full_sync()
        .await
        .unwrap()
        .completed()
        .unwrap();

    assert_eq!(report.history.path, SyncPath::SinglePage);
    assert_eq!(report.history.remote_pages_before, 3);
    assert_eq!(report.history.records.len(), 8);
    assert_eq!(remote_index(&remote, HISTORY_INDEX).total_pages, 1);
    assert_eq!(remote.file(&page_path(2)).unwrap(), stale_page);
}

#[tokio::test]
async fn local_copy_wins_on_collision() {
    let store = TestStore::memory();
    store
        .put(
            Collection::History,
            Record::with_id("shared", 1).with_field("answer", "local"),
        )
        .unwrap();
    let remote = Arc::new(MemoryRemote::new());
    seed_remote(
        &remote,
        vec![
            Record::with_id("shared", 99).with_field("answer", "remote"),
            Record::with_id("only-remote", 50),
        ],
    );

    let report = coordinator(store.shared(), &remote)
        .full_sync()
        .await
        .unwrap()
        .completed()
        .unwrap();

    assert_eq!(ids(&report.history.records), ids(&[
        Record::with_id("shared", 0),
        Record::with_id("only-remote", 0),
    ]));
    let shared = store.get(Collection::History, "shared").unwrap().unwrap();
    assert_eq!(shared.timestamp, 1);
    assert_eq!(shared.field("answer"), Some(&serde_json::json!("local")));
}

#[tokio::test]
async fn local_delete_is_pushed_then_reintroduced_by_a_stale_device() {
    // Device 1 and device 3 both hold "x" after an earlier sync.
    let remote = Arc::new(MemoryRemote::new());
    let device1 = TestStore::memory();
    let device3 = TestStore::memory();
    for store in [&device1, &device3] {
        store
            .put_batch(Collection::History, numbered_records("h", 5))
            .unwrap();
        store
            .put(Collection::History, Record::with_id("x", BASE_TIMESTAMP))
            .unwrap();
    }
    coordinator(device1.shared(), &remote)
        .full_sync()
        .await
        .unwrap();

    // Device 1 deletes "x" and pushes.
    device1.delete(Collection::History, "x").unwrap();
    coordinator(device1.shared(), &remote).push().await.unwrap();
    assert!(!ids(&remote_page(&remote, 0).records).contains("x"));

    // Device 3 never saw the delete; its own copy wins the merge.
    let report = coordinator(device3.shared(), &remote)
        .full_sync()
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert!(ids(&report.history.records).contains("x"));
    assert!(ids(&remote_page(&remote, 0).records).contains("x"));
}

#[tokio::test]
async fn pushing_twice_writes_identical_bytes() {
    let store = populated_store(230, 40);
    let remote = Arc::new(MemoryRemote::new());
    let sync = coordinator(store.shared(), &remote);

    sync.push().await.unwrap();
    let first: Vec<_> = remote
        .paths()
        .into_iter()
        .map(|p| (p.clone(), remote.file(&p)))
        .collect();
    let mut first_puts = remote.take_requests();

    sync.push().await.unwrap();
    let second: Vec<_> = remote
        .paths()
        .into_iter()
        .map(|p| (p.clone(), remote.file(&p)))
        .collect();
    let mut second_puts = remote.take_requests();

    assert_eq!(first, second);
    first_puts.sort_by_key(|r| format!("{r:?}"));
    second_puts.sort_by_key(|r| format!("{r:?}"));
    assert_eq!(first_puts, second_puts);
}

#[tokio::test]
async fn push_does_not_read_the_remote() {
    let store = populated_store(20, 0);
    let remote = Arc::new(MemoryRemote::new());

    let report = coordinator(store.shared(), &remote)
        .push()
        .await
        .unwrap()
        .completed()
        .unwrap();

    assert_eq!(report.history_pages, 1);
    assert_eq!(report.notebook_pages, 0);
    assert_eq!(
        remote.put_paths(),
        vec![
            page_path(0),
            HISTORY_INDEX.to_string(),
            "studysync/notebook/index.json".to_string(),
        ]
    );
    assert!(remote
        .requests()
        .iter()
        .all(|r| matches!(r, studysync_sync_engine::RemoteRequest::Put(_))));
}

#[tokio::test]
async fn failed_upload_leaves_local_untouched_and_skips_index() {
    let store = TestStore::memory();
    store
        .put_batch(Collection::History, numbered_records_from("local", 1, 10))
        .unwrap();
    let remote = Arc::new(MemoryRemote::new());
    seed_remote(&remote, numbered_records_from("remote", 1, 95));
    let old_index = remote.file(HISTORY_INDEX).unwrap();
    let old_page = remote.file(&page_path(0)).unwrap();
    remote.fail_puts_after(0);

    let sync = coordinator(store.shared(), &remote);
    let err = sync.full_sync().await.unwrap_err();

    assert!(matches!(err, SyncError::Http { status: 507, .. }));
    assert!(err.is_retryable());
    assert_eq!(store.count(Collection::History).unwrap(), 10);
    assert_eq!(remote.file(HISTORY_INDEX).unwrap(), old_index);
    assert_eq!(remote.file(&page_path(0)).unwrap(), old_page);

    let status = sync.status();
    assert_eq!(status.full_sync, SyncState::Failed);
    assert_eq!(status.stats.failures, 1);
    assert!(status.stats.last_error.is_some());
    assert_eq!(status.message(), "sync failed, using local data");

    // The next full sync repairs the remote.
    remote.clear_failures();
    sync.full_sync().await.unwrap();
    assert_eq!(remote_index(&remote, HISTORY_INDEX).total_records, 105);
    assert_eq!(sync.status().full_sync, SyncState::Completed);
}

#[tokio::test]
async fn offline_remote_fails_push_without_local_damage() {
    let store = populated_store(3, 3);
    let remote = Arc::new(MemoryRemote::new());
    remote.set_offline(true);
    let sync = coordinator(store.shared(), &remote);

    let err = sync.push().await.unwrap_err();
    assert!(matches!(err, SyncError::Transport { retryable: true, .. }));
    assert!(!sync.probe().await);
    assert_eq!(store.count(Collection::Notebook).unwrap(), 3);
    assert_eq!(sync.status().push, SyncState::Failed);
}

#[tokio::test]
async fn disabled_config_never_touches_the_network() {
    let store = populated_store(3, 0);
    let config = SyncConfig::new(RemoteConfig::from_settings(
        "https://dav.example.com",
        "ana",
        "pw",
        false,
    ));
    let sync = Arc::new(SyncCoordinator::from_config(store.shared(), config).unwrap());

    assert!(!sync.is_enabled());
    assert!(sync.full_sync().await.unwrap().is_disabled());
    assert!(matches!(
        sync.spawn_push().wait().await.unwrap(),
        SyncOutcome::Disabled
    ));
    assert!(!sync.probe().await);
    assert_eq!(sync.status().message(), "sync disabled");
    assert_eq!(store.count(Collection::History).unwrap(), 3);
}

#[tokio::test]
async fn background_push_is_observable() {
    let store = populated_store(0, 0);
    let remote = Arc::new(MemoryRemote::new());
    let sync = Arc::new(coordinator(store.shared(), &remote));

    store
        .put(Collection::Notebook, Record::with_id("n-new", BASE_TIMESTAMP))
        .unwrap();
    let handle = sync.spawn_push();
    let report = handle.wait().await.unwrap().completed().unwrap();

    assert_eq!(report.notebook_pages, 1);
    let page = PagedData::<Record>::from_json(
        &remote.file("studysync/notebook/page_0.json").unwrap(),
    )
    .unwrap();
    assert_eq!(page.records[0].id, "n-new");
    assert_eq!(sync.status().stats.pushes_completed, 1);
}

#[tokio::test]
async fn full_sync_persists_merged_set_on_disk() {
    let remote = Arc::new(MemoryRemote::new());
    seed_remote(&remote, numbered_records_from("remote", 1, 4));
    let dir = tempfile::tempdir().unwrap();

    {
        let store = Arc::new(LocalStore::open(dir.path()).unwrap());
        store
            .put(Collection::History, Record::with_id("local-1", BASE_TIMESTAMP))
            .unwrap();
        coordinator(Arc::clone(&store), &remote)
            .full_sync()
            .await
            .unwrap();
        store.close().unwrap();
    }

    let reopened = LocalStore::open(dir.path()).unwrap();
    assert_eq!(reopened.count(Collection::History).unwrap(), 5);
    assert!(reopened.get(Collection::History, "remote4").unwrap().is_some());
}

#[tokio::test]
async fn failed_local_replace_leaves_both_collections_untouched() {
    let history = FaultyBackend::new();
    let notebook = FaultyBackend::new();
    let store = Arc::new(
        LocalStore::open_with_backends(StoreConfig::default(), history.boxed(), notebook.boxed())
            .unwrap(),
    );
    store
        .put(Collection::History, Record::with_id("local", BASE_TIMESTAMP))
        .unwrap();

    let remote = Arc::new(MemoryRemote::new());
    seed_remote(&remote, vec![Record::with_id("remote-only", BASE_TIMESTAMP - 1)]);
    notebook.fail_rewrites(true);

    let sync = coordinator(Arc::clone(&store), &remote);
    let err = sync.full_sync().await.unwrap_err();

    assert!(matches!(err, SyncError::Store(_)));
    assert_eq!(store.count(Collection::History).unwrap(), 1);
    assert!(store.get(Collection::History, "remote-only").unwrap().is_none());
    assert_eq!(sync.status().full_sync, SyncState::Failed);

    drop(sync);
    drop(store);
    let reopened =
        LocalStore::open_with_backends(StoreConfig::default(), history.boxed(), notebook.boxed())
            .unwrap();
    assert_eq!(reopened.count(Collection::History).unwrap(), 1);
}
