//! Error types for model loading and querying.
//!
//! Structural/format failures abort the operation and surface a reason;
//! semantic misses (an n-gram that was never stored, a context with no
//! backoff weight) are ordinary control flow and never appear here.

use crate::format::ModelKind;
use std::io;
use thiserror::Error;

/// Result type alias for load-side operations.
pub type Result<T> = std::result::Result<T, LoadError>;

/// A model file could not be loaded. The load either fully succeeds or
/// fails with one of these; no partial model is ever returned.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// File does not start with the model magic bytes.
    #[error("invalid magic bytes")]
    BadMagic,

    /// Format version not supported by this decoder.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u8),

    /// Kind byte is neither count nor prob-backoff.
    #[error("unknown model kind byte: 0x{0:02x}")]
    UnknownKind(u8),

    /// File holds a different model kind than the loader expects.
    #[error("model kind mismatch: expected {expected}, file holds {found}")]
    KindMismatch {
        expected: ModelKind,
        found: ModelKind,
    },

    /// Header order outside the supported range.
    #[error("invalid model order {got}: must be between 1 and {max}")]
    InvalidOrder { got: u8, max: u8 },

    /// Buffer ended before a section was complete.
    #[error("truncated model: {0}")]
    Truncated(String),

    /// A section decoded but does not describe a valid structure.
    #[error("corrupt section: {0}")]
    Corrupt(String),

    /// Per-order child-range boundaries do not close over the next order.
    #[error("range closure violated: {0}")]
    RangeClosure(String),

    /// A stored value code exceeds its codebook.
    #[error("value code {code} out of codebook bounds (len {len})")]
    CorruptCodebook { code: u64, len: usize },
}

impl From<gramdex_core::Error> for LoadError {
    fn from(e: gramdex_core::Error) -> Self {
        LoadError::Corrupt(e.to_string())
    }
}

/// A query was malformed. Recoverable; the model is unaffected.
///
/// A lookup that finds nothing is NOT a query error — it returns count 0
/// (or a backoff continuation) by design.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    #[error("empty n-gram query")]
    EmptyNgram,

    #[error("query order {got} exceeds model order {max}")]
    OrderExceedsModel { got: usize, max: usize },
}
