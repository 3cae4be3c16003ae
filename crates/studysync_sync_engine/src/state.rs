//! Sync status and reports.

use std::time::Duration;
use studysync_store::Record;

/// Progress of one kind of sync operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Never run.
    #[default]
    Idle,
    /// Running now.
    InProgress,
    /// Last run succeeded.
    Completed,
    /// Last run failed; local data was left as it was.
    Failed,
}

impl SyncState {
    /// Returns true while an operation is running.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::InProgress)
    }
}

/// Counters across the coordinator's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Successful full syncs.
    pub full_syncs_completed: u64,
    /// Successful pushes.
    pub pushes_completed: u64,
    /// Failed full syncs and pushes.
    pub failures: u64,
    /// Page files written, index files excluded.
    pub pages_uploaded: u64,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
    /// Time of the most recent success, epoch ms.
    pub last_success: Option<i64>,
}

/// Snapshot of the coordinator's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// Whether a remote is configured.
    pub enabled: bool,
    /// State of full sync.
    pub full_sync: SyncState,
    /// State of incremental push.
    pub push: SyncState,
    /// Counters.
    pub stats: SyncStats,
}

impl SyncStatus {
    /// One line for the user.
    pub fn message(&self) -> &'static str {
        if !self.enabled {
            return "sync disabled";
        }
        if self.full_sync.is_active() || self.push.is_active() {
            return "syncing";
        }
        if self.full_sync == SyncState::Failed || self.push == SyncState::Failed {
            return "sync failed, using local data";
        }
        if self.full_sync == SyncState::Completed || self.push == SyncState::Completed {
            return "synced";
        }
        "not synced yet"
    }
}

/// Result of an operation that does nothing when sync is disabled.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome<T> {
    /// Remote sync is disabled; nothing was done.
    Disabled,
    /// The operation ran.
    Completed(T),
}

impl<T> SyncOutcome<T> {
    /// Returns the report if the operation ran.
    pub fn completed(self) -> Option<T> {
        match self {
            SyncOutcome::Completed(report) => Some(report),
            SyncOutcome::Disabled => None,
        }
    }

    /// Returns true if sync was disabled.
    pub fn is_disabled(&self) -> bool {
        matches!(self, SyncOutcome::Disabled)
    }
}

/// Which branch of the full sync algorithm a collection took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPath {
    /// No remote index existed; the local set was uploaded as is.
    Bootstrap,
    /// Local plus remote page 0 fit on one page.
    SinglePage,
    /// Every remote page was downloaded, merged and re-cut.
    Repaginated,
}

/// Full sync result for one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionReport {
    /// Branch taken.
    pub path: SyncPath,
    /// The merged collection, now stored locally, newest first.
    pub records: Vec<Record>,
    /// Page files written.
    pub pages_uploaded: usize,
    /// Pages the remote index listed before this sync, 0 when absent.
    ///
    /// Remote pages numbered at or past the new page count are left on
    /// the server and no longer referenced.
    pub remote_pages_before: usize,
}

/// Result of a full sync.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// History collection.
    pub history: CollectionReport,
    /// Notebook collection.
    pub notebook: CollectionReport,
    /// Wall time taken.
    pub duration: Duration,
}

/// Result of an incremental push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    /// Pages written for history.
    pub history_pages: usize,
    /// Pages written for the notebook.
    pub notebook_pages: usize,
    /// Wall time taken.
    pub duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(full_sync: SyncState, push: SyncState) -> SyncStatus {
        SyncStatus {
            enabled: true,
            full_sync,
            push,
            stats: SyncStats::default(),
        }
    }

    #[test]
    fn status_messages() {
        assert_eq!(status(SyncState::Idle, SyncState::Idle).message(), "not synced yet");
        assert_eq!(
            status(SyncState::Completed, SyncState::Failed).message(),
            "sync failed, using local data"
        );
        assert_eq!(status(SyncState::Completed, SyncState::InProgress).message(), "syncing");
        assert_eq!(status(SyncState::Completed, SyncState::Idle).message(), "synced");

        let mut disabled = status(SyncState::Idle, SyncState::Idle);
        disabled.enabled = false;
        assert_eq!(disabled.message(), "sync disabled");
    }

    #[test]
    fn outcome_accessors() {
        assert!(SyncOutcome::<u8>::Disabled.is_disabled());
        assert_eq!(SyncOutcome::Completed(3).completed(), Some(3));
        assert_eq!(SyncOutcome::<u8>::Disabled.completed(), None);
    }
}
