//! Error types for the scan pipelines.

use thiserror::Error;

use ledgerdb_core::Address;

/// Errors that can occur while scanning or assembling.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A ledger query failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] ledgerdb_rpc::LedgerError),

    /// A core primitive rejected its input.
    #[error("core error: {0}")]
    Core(ledgerdb_core::CoreError),

    /// The descriptor account does not exist.
    #[error("account not found: {0}")]
    NotFound(Address),

    /// The descriptor account is shorter than its fixed layout.
    #[error("malformed descriptor: expected at least {expected} bytes, got {actual}")]
    Malformed { expected: usize, actual: usize },

    /// A full scan found no qualifying deposit instructions.
    #[error(
        "no chunks found: scanned {signatures_scanned} signatures, \
         {instructions_scanned} instructions"
    )]
    NoChunksFound {
        signatures_scanned: usize,
        instructions_scanned: usize,
    },

    /// The scan was cancelled.
    #[error("scan cancelled")]
    Cancelled,
}

impl From<ledgerdb_core::CoreError> for ScanError {
    fn from(e: ledgerdb_core::CoreError) -> Self {
        match e {
            ledgerdb_core::CoreError::Malformed { expected, actual } => {
                ScanError::Malformed { expected, actual }
            }
            other => ScanError::Core(other),
        }
    }
}

/// Result type for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;
