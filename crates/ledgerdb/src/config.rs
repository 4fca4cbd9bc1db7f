//! Client configuration.

use std::time::Duration;

use ledgerdb_core::Address;
use ledgerdb_scan::ScanConfig;

/// Default per-request timeout for the JSON-RPC ledger.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration threaded through every client entry point.
///
/// There is no process-wide default endpoint: callers always name the
/// ledger and program they read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// JSON-RPC endpoint of the ledger.
    pub rpc_endpoint: String,
    /// Program that owns the tables and upload sessions.
    pub program_id: Address,
    /// Timeout applied to each RPC request.
    pub request_timeout: Duration,
    /// Scan behavior.
    pub scan: ScanConfig,
}

impl ClientConfig {
    pub fn new(rpc_endpoint: impl Into<String>, program_id: Address) -> Self {
        Self {
            rpc_endpoint: rpc_endpoint.into(),
            program_id,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            scan: ScanConfig::default(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_scan(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    /// The same configuration pointed at another endpoint.
    pub fn with_endpoint(mut self, rpc_endpoint: impl Into<String>) -> Self {
        self.rpc_endpoint = rpc_endpoint.into();
        self
    }
}
