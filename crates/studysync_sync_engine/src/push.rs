//! Incremental push of the local state.

use crate::coordinator::{Operation, SyncCoordinator};
use crate::error::{SyncError, SyncResult};
use crate::state::{PushReport, SyncOutcome};
use std::sync::Arc;
use std::time::Instant;
use studysync_store::Collection;
use tokio::task::JoinHandle;

impl SyncCoordinator {
    /// Re-uploads both collections from the local store.
    ///
    /// The remote is not read first: every page of the current local set
    /// is written, then the index. Pushing an unchanged set twice with the
    /// same clock reading writes identical bytes.
    #[tracing::instrument(skip(self))]
    pub async fn push(&self) -> SyncResult<SyncOutcome<PushReport>> {
        let Some(transport) = self.transport() else {
            return Ok(SyncOutcome::Disabled);
        };

        self.begin(Operation::Push);
        let started = Instant::now();

        let result = async {
            let mut pages = [0usize; 2];
            for (slot, collection) in Collection::ALL.into_iter().enumerate() {
                let records = self.store().get_all(collection)?;
                let encoded = self.encode(collection, records)?;
                pages[slot] = self.upload(transport.as_ref(), &encoded).await?;
            }
            Ok::<_, SyncError>(pages)
        }
        .await;

        match result {
            Ok([history_pages, notebook_pages]) => {
                self.succeed(Operation::Push, history_pages + notebook_pages);
                let report = PushReport {
                    history_pages,
                    notebook_pages,
                    duration: started.elapsed(),
                };
                tracing::info!(history_pages, notebook_pages, "push completed");
                Ok(SyncOutcome::Completed(report))
            }
            Err(e) => {
                self.fail(Operation::Push, &e);
                Err(e)
            }
        }
    }

    /// Starts [`SyncCoordinator::push`] on the tokio runtime and returns at
    /// once.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_push(self: &Arc<Self>) -> PushHandle {
        let this = Arc::clone(self);
        PushHandle {
            task: tokio::spawn(async move { this.push().await }),
        }
    }
}

/// A push running in the background.
///
/// Dropping the handle detaches the task; it still runs to completion.
#[derive(Debug)]
pub struct PushHandle {
    task: JoinHandle<SyncResult<SyncOutcome<PushReport>>>,
}

impl PushHandle {
    /// Waits for the push and returns its result.
    pub async fn wait(self) -> SyncResult<SyncOutcome<PushReport>> {
        self.task
            .await
            .map_err(|e| SyncError::TaskFailed(e.to_string()))?
    }

    /// Returns true once the push has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
