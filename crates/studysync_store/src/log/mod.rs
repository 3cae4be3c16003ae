//! Append-only record log.
//!
//! Every collection mutation becomes one frame appended to the
//! collection's log. Opening a store replays the log to rebuild the live
//! record set.
//!
//! ## Frame Format
//!
//! ```text
//! | magic "SSRL" (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! `Put` and `Replace` payloads are CBOR, `Delete` carries the UTF-8 id.
//!
//! ## Recovery Policy
//!
//! - A truncated trailing frame (crash before the write completed) is
//!   dropped and the log is cut back to the last whole frame.
//! - A CRC mismatch, bad magic, unknown type or newer version refuses to
//!   open the store. No heuristic repair is attempted.
//!
//! ## Invariants
//!
//! - A frame is never modified after it is written
//! - Frames are flushed before the mutation is acknowledged
//! - Snapshots replace the log atomically (see [`RecordLog::rewrite`])

mod frame;
mod writer;

pub(crate) use frame::LogOp;
pub(crate) use writer::RecordLog;
