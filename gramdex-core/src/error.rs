//! Error types for gramdex-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Input sequence to a monotone codec decreased at `pos`.
    #[error("sequence is not sorted at position {pos}: {value} < {prev}")]
    Unsorted { pos: usize, value: u64, prev: u64 },

    /// Requested integer width cannot be packed into 64-bit words.
    #[error("invalid integer width {0}: must be between 1 and 64")]
    WidthOverflow(u8),

    /// Raw parts handed to a constructor do not describe a valid structure.
    #[error("inconsistent structure parts: {0}")]
    InvalidParts(String),
}
