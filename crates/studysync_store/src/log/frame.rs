//! Record log frames and their binary encoding.

use crate::error::{StoreError, StoreResult};
use crate::record::Record;

/// Magic bytes opening every frame.
pub const LOG_MAGIC: [u8; 4] = *b"SSRL";

/// Current frame format version.
pub const LOG_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4)
pub(crate) const HEADER_SIZE: usize = 11;

pub(crate) const CRC_SIZE: usize = 4;

/// Kind of operation stored in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogOpType {
    /// Upsert a record.
    Put = 1,
    /// Remove a record by id.
    Delete = 2,
    /// Drop the whole collection and install a snapshot.
    Replace = 3,
}

impl LogOpType {
    /// Converts a byte to an operation type.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Put),
            2 => Some(Self::Delete),
            3 => Some(Self::Replace),
            _ => None,
        }
    }

    /// Converts the operation type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One logged mutation of a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum LogOp {
    /// Insert or replace the record with this id.
    Put(Record),
    /// Remove the record with this id, if present.
    Delete(String),
    /// Replace the entire collection with these records.
    Replace(Vec<Record>),
}

impl LogOp {
    /// Returns the operation type.
    #[must_use]
    pub fn op_type(&self) -> LogOpType {
        match self {
            Self::Put(_) => LogOpType::Put,
            Self::Delete(_) => LogOpType::Delete,
            Self::Replace(_) => LogOpType::Replace,
        }
    }

    /// Serializes the operation payload (without envelope).
    ///
    /// Records are CBOR; a delete carries the bare UTF-8 id.
    pub fn encode_payload(&self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            Self::Put(record) => {
                ciborium::into_writer(record, &mut buf).map_err(StoreError::codec)?;
            }
            Self::Delete(id) => buf.extend_from_slice(id.as_bytes()),
            Self::Replace(records) => {
                ciborium::into_writer(records, &mut buf).map_err(StoreError::codec)?;
            }
        }
        Ok(buf)
    }

    /// Deserializes an operation from its type and payload.
    pub fn decode_payload(op_type: LogOpType, payload: &[u8]) -> StoreResult<Self> {
        match op_type {
            LogOpType::Put => {
                let record = ciborium::from_reader(payload).map_err(StoreError::codec)?;
                Ok(Self::Put(record))
            }
            LogOpType::Delete => {
                let id = std::str::from_utf8(payload).map_err(StoreError::codec)?;
                Ok(Self::Delete(id.to_string()))
            }
            LogOpType::Replace => {
                let records = ciborium::from_reader(payload).map_err(StoreError::codec)?;
                Ok(Self::Replace(records))
            }
        }
    }

    /// Builds the full frame: header, payload and trailing CRC32.
    pub fn encode_frame(&self) -> StoreResult<Vec<u8>> {
        let payload = self.encode_payload()?;
        let len = u32::try_from(payload.len()).map_err(|_| {
            StoreError::InvalidRecord(format!(
                "log payload of {} bytes exceeds the frame limit",
                payload.len()
            ))
        })?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&LOG_MAGIC);
        frame.extend_from_slice(&LOG_VERSION.to_le_bytes());
        frame.push(self.op_type().as_byte());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);

        let crc = crc32fast::hash(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }
}

/// Result of scanning raw log bytes.
#[derive(Debug, Default)]
pub struct FrameScan {
    /// Decoded operations with their frame offsets, in log order.
    pub ops: Vec<(u64, LogOp)>,
    /// Length of the well-formed prefix. Anything after it is a torn tail.
    pub valid_len: u64,
}

/// Decodes every frame in `bytes`.
///
/// A trailing frame cut short by a crash ends the scan cleanly and is
/// reported through [`FrameScan::valid_len`]. Bad magic, an unknown type,
/// a future version or a CRC mismatch is fatal.
pub fn scan_frames(bytes: &[u8]) -> StoreResult<FrameScan> {
    let mut scan = FrameScan::default();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let offset = pos as u64;
        let rest = &bytes[pos..];

        if rest.len() < HEADER_SIZE {
            break;
        }

        if rest[0..4] != LOG_MAGIC {
            return Err(StoreError::corrupted(offset, "invalid magic"));
        }

        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version > LOG_VERSION {
            return Err(StoreError::corrupted(
                offset,
                format!("unsupported frame version {version}"),
            ));
        }

        let type_byte = rest[6];
        let op_type = LogOpType::from_byte(type_byte).ok_or_else(|| {
            StoreError::corrupted(offset, format!("unknown operation type {type_byte}"))
        })?;

        let len = u32::from_le_bytes([rest[7], rest[8], rest[9], rest[10]]) as usize;
        let frame_len = HEADER_SIZE + len + CRC_SIZE;
        if rest.len() < frame_len {
            break;
        }

        let body = &rest[..HEADER_SIZE + len];
        let stored = &rest[HEADER_SIZE + len..frame_len];
        let expected = u32::from_le_bytes([stored[0], stored[1], stored[2], stored[3]]);
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(StoreError::ChecksumMismatch {
                offset,
                expected,
                actual,
            });
        }

        let op = LogOp::decode_payload(op_type, &body[HEADER_SIZE..])
            .map_err(|e| StoreError::corrupted(offset, e.to_string()))?;
        scan.ops.push((offset, op));

        pos += frame_len;
        scan.valid_len = pos as u64;
    }

    Ok(scan)
}
