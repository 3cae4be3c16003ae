//! Record log writer and recovery.

use crate::error::StoreResult;
use crate::log::frame::{scan_frames, LogOp};
use crate::record::Record;
use parking_lot::Mutex;
use std::collections::HashMap;
use studysync_storage::{StorageBackend, StorageResult};

/// State rebuilt from a record log.
#[derive(Debug, Default)]
pub struct Recovered {
    /// Live records keyed by id.
    pub records: HashMap<String, Record>,
    /// Number of frames replayed.
    pub frames: usize,
    /// Bytes dropped from a torn trailing frame.
    pub discarded_bytes: u64,
}

/// Append-only log of collection mutations.
pub struct RecordLog {
    backend: Mutex<Box<dyn StorageBackend>>,
    sync_on_write: bool,
}

impl RecordLog {
    /// Creates a log over the given backend.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_write: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_write,
        }
    }

    /// Appends one operation as a single frame.
    ///
    /// The frame is flushed (and synced when `sync_on_write` is set) before
    /// this returns, so an acknowledged write survives a crash.
    ///
    /// If any step fails the log is cut back to its previous length, so a
    /// failed append leaves neither a torn frame nor a frame the caller was
    /// told did not happen.
    pub fn append(&self, op: &LogOp) -> StoreResult<u64> {
        let frame = op.encode_frame()?;

        let mut backend = self.backend.lock();
        let offset = backend.size()?;
        if let Err(e) = write_frame(&mut **backend, &frame, self.sync_on_write) {
            if let Err(rollback) = backend.truncate(offset) {
                tracing::error!(
                    offset,
                    error = %rollback,
                    "failed to roll back record log after a failed append"
                );
            }
            return Err(e.into());
        }

        Ok(offset)
    }

    /// Replays the log and rebuilds the live record set.
    ///
    /// A torn trailing frame is cut off so later appends start on a frame
    /// boundary.
    pub fn recover(&self) -> StoreResult<Recovered> {
        let mut backend = self.backend.lock();
        let bytes = backend.read_all()?;
        let scan = scan_frames(&bytes)?;

        let mut recovered = Recovered {
            frames: scan.ops.len(),
            ..Recovered::default()
        };
        for (_, op) in scan.ops {
            apply(&mut recovered.records, op);
        }

        let size = bytes.len() as u64;
        if scan.valid_len < size {
            recovered.discarded_bytes = size - scan.valid_len;
            tracing::warn!(
                discarded = recovered.discarded_bytes,
                "dropping torn frame at end of record log"
            );
            backend.truncate(scan.valid_len)?;
        }

        Ok(recovered)
    }

    /// Atomically replaces the whole log with one snapshot frame.
    pub fn rewrite(&self, records: &[Record]) -> StoreResult<()> {
        let frame = LogOp::Replace(records.to_vec()).encode_frame()?;
        self.backend.lock().rewrite(&frame)?;
        Ok(())
    }

    /// Flushes buffered writes.
    pub fn flush(&self) -> StoreResult<()> {
        let mut backend = self.backend.lock();
        backend.flush()?;
        backend.sync()?;
        Ok(())
    }

    /// Returns the current log size in bytes.
    pub fn size(&self) -> StoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }
}

fn write_frame(
    backend: &mut dyn StorageBackend,
    frame: &[u8],
    sync: bool,
) -> StorageResult<()> {
    backend.append(frame)?;
    backend.flush()?;
    if sync {
        backend.sync()?;
    }
    Ok(())
}

/// Applies one operation to an in-memory record map.
pub fn apply(records: &mut HashMap<String, Record>, op: LogOp) {
    match op {
        LogOp::Put(record) => {
            records.insert(record.id.clone(), record);
        }
        LogOp::Delete(id) => {
            records.remove(&id);
        }
        LogOp::Replace(snapshot) => {
            records.clear();
            for record in snapshot {
                records.insert(record.id.clone(), record);
            }
        }
    }
}
