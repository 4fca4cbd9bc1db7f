//! Error types for ledger queries.

use thiserror::Error;

/// Errors that can occur while querying a ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The request never produced a response (connect, timeout, I/O).
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A value in the response failed to decode.
    #[error("core error: {0}")]
    Core(#[from] ledgerdb_core::CoreError),
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        LedgerError::Transport(e.to_string())
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
