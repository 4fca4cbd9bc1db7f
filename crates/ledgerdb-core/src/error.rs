//! Error types for ledgerdb core.

use thiserror::Error;

/// Core errors raised by the pure primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("malformed account: expected at least {expected} bytes, got {actual}")]
    Malformed { expected: usize, actual: usize },

    #[error("no valid program address found for seeds")]
    NoViableBump,

    #[error("seed exceeds {max} bytes: {len}")]
    SeedTooLong { len: usize, max: usize },

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("schema error: {0}")]
    Schema(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
