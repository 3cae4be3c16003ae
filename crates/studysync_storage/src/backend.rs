//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level byte store holding one record log.
///
/// The record log owns the framing; a backend only moves bytes.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `sync` makes everything appended so far survive process termination
/// - `rewrite` replaces the whole contents atomically: after a crash the
///   backend holds either the old bytes or the new bytes, never a mix
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ReadPastEnd`] if the range extends past
    /// the current size, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Reads the full contents.
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        let len = usize::try_from(size).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::OutOfMemory,
                format!("storage of {size} bytes does not fit in memory"),
            )
        })?;
        self.read_at(0, len)
    }

    /// Appends data to the end of the storage and returns its offset.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    fn flush(&mut self) -> StorageResult<()>;

    /// Forces data and metadata to durable storage.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current size in bytes (the offset of the next append).
    fn size(&self) -> StorageResult<u64>;

    /// Cuts the storage back to `new_size` bytes.
    ///
    /// Used by recovery to drop a torn trailing frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::TruncateBeyondEnd`] if `new_size` is
    /// larger than the current size.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Atomically replaces the entire contents with `data`.
    fn rewrite(&mut self, data: &[u8]) -> StorageResult<()>;
}
