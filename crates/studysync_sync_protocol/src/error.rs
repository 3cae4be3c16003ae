//! Error types for the sync protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors decoding or validating remote documents.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A page or index file is not valid JSON of the expected shape.
    #[error("malformed {document}: {source}")]
    Malformed {
        /// Which document failed to parse.
        document: &'static str,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// A document could not be serialized.
    #[error("failed to encode {document}: {source}")]
    Encode {
        /// Which document failed to serialize.
        document: &'static str,
        /// Underlying serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// The remote index was written by a newer protocol version.
    #[error("unsupported index version {found} (max supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the document.
        found: u32,
        /// Highest version this build understands.
        supported: u32,
    },

    /// A downloaded page carried a different number than requested.
    #[error("page number mismatch: expected {expected}, got {actual}")]
    PageMismatch {
        /// Page number that was requested.
        expected: u32,
        /// Page number found in the file.
        actual: u32,
    },
}
