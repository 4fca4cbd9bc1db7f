//! Error types for the client.

use ledgerdb_core::CoreError;
use ledgerdb_rpc::LedgerError;
use ledgerdb_scan::ScanError;
use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Address or key parsing failed.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Ledger query failed outside a scan.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Scan or assembly failed.
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// The configuration cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// HTTP-style status for a transport layer.
    ///
    /// Missing data is 404, unusable input is 400, everything else 500.
    pub fn status_code(&self) -> u16 {
        match self {
            ClientError::Scan(ScanError::NotFound(_))
            | ClientError::Scan(ScanError::NoChunksFound { .. }) => 404,
            ClientError::Scan(ScanError::Malformed { .. })
            | ClientError::Scan(ScanError::Core(_))
            | ClientError::Core(_)
            | ClientError::InvalidConfig(_) => 400,
            _ => 500,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
