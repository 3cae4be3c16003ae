//! Page and index documents stored on the remote.

use crate::error::{ProtocolError, ProtocolResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use studysync_store::Record;

/// Records per page.
pub const PAGE_SIZE: usize = 100;

/// Current index document version.
pub const INDEX_VERSION: u32 = 1;

/// One page of a collection, `page_{n}.json` on the remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(serialize = "R: Serialize", deserialize = "R: DeserializeOwned"))]
pub struct PagedData<R = Record> {
    /// Position of this page, 0 holds the newest records.
    pub page_number: u32,
    /// Records, newest first.
    pub records: Vec<R>,
}

impl<R: Serialize + DeserializeOwned> PagedData<R> {
    /// Encodes the page as JSON.
    pub fn to_json(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| ProtocolError::Encode {
            document: "page",
            source,
        })
    }

    /// Decodes a page from JSON.
    pub fn from_json(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(|source| ProtocolError::Malformed {
            document: "page",
            source,
        })
    }

    /// Decodes a page and checks it is the one that was asked for.
    pub fn from_json_expecting(bytes: &[u8], page_number: u32) -> ProtocolResult<Self> {
        let page = Self::from_json(bytes)?;
        if page.page_number != page_number {
            return Err(ProtocolError::PageMismatch {
                expected: page_number,
                actual: page.page_number,
            });
        }
        Ok(page)
    }
}

/// Summary of one page inside a [`PageIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEntry {
    /// Page number.
    pub page_number: u32,
    /// Records on the page.
    pub record_count: usize,
    /// When the page was last written, epoch ms.
    pub last_modified: i64,
}

/// Describes how a collection is paginated on the remote, `index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageIndex {
    /// Document version.
    pub version: u32,
    /// Records across all pages.
    pub total_records: usize,
    /// Page capacity the collection was cut with.
    pub page_size: usize,
    /// Number of pages.
    pub total_pages: usize,
    /// When the index was written, epoch ms.
    pub last_sync_time: i64,
    /// One entry per page, in page order.
    pub pages: Vec<PageEntry>,
}

impl PageIndex {
    /// Encodes the index as JSON.
    pub fn to_json(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| ProtocolError::Encode {
            document: "index",
            source,
        })
    }

    /// Decodes an index, rejecting versions newer than [`INDEX_VERSION`].
    pub fn from_json(bytes: &[u8]) -> ProtocolResult<Self> {
        let index: Self =
            serde_json::from_slice(bytes).map_err(|source| ProtocolError::Malformed {
                document: "index",
                source,
            })?;
        if index.version > INDEX_VERSION {
            return Err(ProtocolError::UnsupportedVersion {
                found: index.version,
                supported: INDEX_VERSION,
            });
        }
        Ok(index)
    }

    /// Page numbers listed by the index, in order.
    pub fn page_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.iter().map(|p| p.page_number)
    }

    /// Whether the counts agree with each other.
    ///
    /// A remote left half-written by an interrupted upload can fail this.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let sum: usize = self.pages.iter().map(|p| p.record_count).sum();
        self.page_size > 0
            && sum == self.total_records
            && self.pages.len() == self.total_pages
            && self.total_pages == self.total_records.div_ceil(self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn index_uses_camel_case_keys() {
        let index = PageIndex {
            version: INDEX_VERSION,
            total_records: 3,
            page_size: PAGE_SIZE,
            total_pages: 1,
            last_sync_time: 1_700_000_000_000,
            pages: vec![PageEntry {
                page_number: 0,
                record_count: 3,
                last_modified: 1_700_000_000_000,
            }],
        };

        let value: serde_json::Value = serde_json::from_slice(&index.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "version": 1,
                "totalRecords": 3,
                "pageSize": 100,
                "totalPages": 1,
                "lastSyncTime": 1_700_000_000_000_i64,
                "pages": [{"pageNumber": 0, "recordCount": 3, "lastModified": 1_700_000_000_000_i64}]
            })
        );
        assert!(index.is_consistent());
        assert_eq!(PageIndex::from_json(&index.to_json().unwrap()).unwrap(), index);
    }

    #[test]
    fn page_accepts_foreign_payload_fields() {
        let bytes = br#"{"pageNumber":2,"records":[{"id":"n1","timestamp":5,"question":"7 x 8","mistakes":2}]}"#;
        let page: PagedData = PagedData::from_json(bytes).unwrap();

        assert_eq!(page.page_number, 2);
        assert_eq!(page.records[0].id, "n1");
        assert_eq!(page.records[0].field("mistakes"), Some(&json!(2)));
    }

    #[test]
    fn wrong_page_number_is_rejected() {
        let bytes = br#"{"pageNumber":1,"records":[]}"#;
        assert!(matches!(
            PagedData::<Record>::from_json_expecting(bytes, 0),
            Err(ProtocolError::PageMismatch { expected: 0, actual: 1 })
        ));
    }

    #[test]
    fn newer_index_version_is_rejected() {
        let bytes = br#"{"version":2,"totalRecords":0,"pageSize":100,"totalPages":0,"lastSyncTime":0,"pages":[]}"#;
        assert!(matches!(
            PageIndex::from_json(bytes),
            Err(ProtocolError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            PageIndex::from_json(b"<html>not found</html>"),
            Err(ProtocolError::Malformed { document: "index", .. })
        ));
    }

    #[test]
    fn inconsistent_counts_are_detected() {
        let index = PageIndex {
            version: INDEX_VERSION,
            total_records: 150,
            page_size: PAGE_SIZE,
            total_pages: 2,
            last_sync_time: 0,
            pages: vec![PageEntry {
                page_number: 0,
                record_count: 100,
                last_modified: 0,
            }],
        };
        assert!(!index.is_consistent());
    }
}
