//! The Client: one entry point over derivation, scanning and assembly.

use serde_json::Value;

use ledgerdb_core::{Address, AddressBook, AddressDeriver, InstructionSchema};
use ledgerdb_rpc::{HttpLedger, Ledger};
use ledgerdb_scan::{
    CancellationToken, ChunkAssembler, InstructionDecoder, LedgerScanner, Reconstruction,
    RowAssembler,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::report::{
    ErrorBody, ReadDiagnostics, ReconstructRequest, ReconstructionReport, TableRead,
};

/// Reads tables and blobs for one program from one ledger.
///
/// Stateless between calls: every read derives, scans and assembles afresh.
pub struct Client<L: Ledger> {
    scanner: LedgerScanner<L>,
    deriver: AddressDeriver,
    decoder: InstructionDecoder,
    config: ClientConfig,
}

impl Client<HttpLedger> {
    /// Connect to the configured JSON-RPC endpoint.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        if config.rpc_endpoint.trim().is_empty() {
            return Err(ClientError::InvalidConfig("rpc endpoint is empty".into()));
        }
        let ledger = HttpLedger::new(config.rpc_endpoint.clone(), config.request_timeout)?;
        Ok(Self::with_ledger(ledger, config))
    }
}

impl<L: Ledger> Client<L> {
    /// Create a client over any ledger.
    pub fn with_ledger(ledger: L, config: ClientConfig) -> Self {
        Self {
            scanner: LedgerScanner::new(ledger, config.scan.clone()),
            deriver: AddressDeriver::new(config.program_id),
            decoder: InstructionDecoder::new(config.program_id, InstructionSchema::standard()),
            config,
        }
    }

    /// Decode against `schema` instead of the standard one.
    pub fn with_schema(mut self, schema: InstructionSchema) -> Self {
        self.decoder = InstructionDecoder::new(self.config.program_id, schema);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        self.scanner.ledger()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Addresses
    // ─────────────────────────────────────────────────────────────────────────

    /// Every role address for `name` under `owner`.
    pub fn addresses(&self, owner: &str, name: &str) -> Result<AddressBook> {
        let owner = parse_key(owner)?;
        Ok(self.deriver.address_book(&owner, name)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tables
    // ─────────────────────────────────────────────────────────────────────────

    /// Rows recorded against the owner's root address.
    pub async fn read_root(&self, owner: &str) -> Result<TableRead> {
        self.read_root_with_cancel(owner, &CancellationToken::new())
            .await
    }

    pub async fn read_root_with_cancel(
        &self,
        owner: &str,
        cancel: &CancellationToken,
    ) -> Result<TableRead> {
        let owner = parse_key(owner)?;
        let address = self.deriver.root(&owner)?;
        self.read_address(address, RowAssembler::new(), cancel).await
    }

    /// Rows of one table.
    pub async fn read_table(&self, owner: &str, table: &str) -> Result<TableRead> {
        self.read_table_with_cancel(owner, table, &CancellationToken::new())
            .await
    }

    pub async fn read_table_with_cancel(
        &self,
        owner: &str,
        table: &str,
        cancel: &CancellationToken,
    ) -> Result<TableRead> {
        let owner = parse_key(owner)?;
        let address = self.deriver.table(&owner, table)?;
        self.read_address(address, RowAssembler::for_table(table), cancel)
            .await
    }

    /// Rows of the extension table `extension` attached to row `row_id`.
    pub async fn read_extension_table(
        &self,
        owner: &str,
        table: &str,
        row_id: &str,
        extension: &str,
    ) -> Result<TableRead> {
        self.read_extension_table_with_cancel(
            owner,
            table,
            row_id,
            extension,
            &CancellationToken::new(),
        )
        .await
    }

    pub async fn read_extension_table_with_cancel(
        &self,
        owner: &str,
        table: &str,
        row_id: &str,
        extension: &str,
        cancel: &CancellationToken,
    ) -> Result<TableRead> {
        let owner = parse_key(owner)?;
        let address = self
            .deriver
            .extension_table(&owner, table, row_id, extension)?;
        self.read_address(address, RowAssembler::new(), cancel).await
    }

    async fn read_address(
        &self,
        address: Address,
        assembler: RowAssembler,
        cancel: &CancellationToken,
    ) -> Result<TableRead> {
        let max = self.config.scan.max_signatures;
        let outcome = self.scanner.scan(&address, max, cancel).await?;
        let decoded = self.decoder.decode_all(&outcome.transactions);
        let tables = assembler.assemble(&decoded.instructions);

        Ok(TableRead {
            address,
            tables,
            diagnostics: ReadDiagnostics {
                signatures_scanned: outcome.signatures.len(),
                transactions_fetched: outcome.transactions.len(),
                missing_bodies: outcome.missing_bodies.len(),
                decode: decoded.counts,
            },
            cancelled: outcome.cancelled,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Blobs
    // ─────────────────────────────────────────────────────────────────────────

    /// Reconstruct the blob uploaded under `session`.
    pub async fn reconstruct(&self, session: &str) -> Result<ReconstructionReport> {
        self.reconstruct_with_cancel(session, &CancellationToken::new())
            .await
    }

    pub async fn reconstruct_with_cancel(
        &self,
        session: &str,
        cancel: &CancellationToken,
    ) -> Result<ReconstructionReport> {
        let address = parse_key(session)?;
        let rec = self.reconstruct_blob(&address, cancel).await?;
        Ok(ReconstructionReport::new(address, &rec))
    }

    /// Reconstruct without building the wire report.
    pub async fn reconstruct_blob(
        &self,
        session: &Address,
        cancel: &CancellationToken,
    ) -> Result<Reconstruction> {
        Ok(ChunkAssembler::new(&self.scanner)
            .reconstruct(session, cancel)
            .await?)
    }

    /// Status and JSON body for a reconstruction endpoint.
    pub async fn respond(&self, session: &str) -> (u16, Value) {
        match self.reconstruct(session).await {
            Ok(report) => (200, serde_json::to_value(&report).unwrap_or(Value::Null)),
            Err(e) => {
                tracing::warn!(session, error = %e, "reconstruction failed");
                let body = serde_json::to_value(ErrorBody::from(&e)).unwrap_or(Value::Null);
                (e.status_code(), body)
            }
        }
    }
}

/// Serve one reconstruction request against a fresh JSON-RPC client.
///
/// The request's endpoint, when given, replaces the configured one.
pub async fn handle_reconstruct(request: &ReconstructRequest, base: &ClientConfig) -> (u16, Value) {
    let mut config = base.clone();
    if let Some(endpoint) = &request.rpc_endpoint {
        config = config.with_endpoint(endpoint.clone());
    }
    match Client::connect(config) {
        Ok(client) => client.respond(&request.session_address).await,
        Err(e) => {
            let body = serde_json::to_value(ErrorBody::from(&e)).unwrap_or(Value::Null);
            (e.status_code(), body)
        }
    }
}

fn parse_key(s: &str) -> Result<Address> {
    Ok(Address::from_base58(s.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerdb_core::{AccountInfo, CoreError, Namespace};
    use ledgerdb_rpc::MemoryLedger;

    const PROGRAM: Address = Address::from_bytes([9; 32]);

    fn client() -> Client<MemoryLedger> {
        Client::with_ledger(
            MemoryLedger::new(),
            ClientConfig::new("memory://", PROGRAM),
        )
    }

    #[test]
    fn test_addresses_distinct_per_role() {
        let owner = Address::from_bytes([1; 32]).to_base58();
        let book = client().addresses(&owner, "users").unwrap();
        let all = [book.root, book.table, book.instruction_log, book.target_log];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(
            book.table,
            AddressDeriver::new(PROGRAM)
                .named(Namespace::Table, &Address::from_bytes([1; 32]), "users")
                .unwrap()
        );
    }

    #[test]
    fn test_invalid_owner_is_invalid_key() {
        let err = client().addresses("not-base58-0OIl", "users").unwrap_err();
        assert!(matches!(err, ClientError::Core(CoreError::InvalidKey(_))));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_empty_table_read() {
        let owner = Address::from_bytes([1; 32]).to_base58();
        let read = client().read_table(&owner, "users").await.unwrap();
        assert_eq!(read.row_count(), 0);
        assert!(!read.cancelled);
    }

    #[tokio::test]
    async fn test_respond_maps_errors() {
        let client = client();
        let session = Address::from_bytes([4; 32]);

        let (status, body) = client.respond(&session.to_base58()).await;
        assert_eq!(status, 404);
        assert!(body["error"].as_str().unwrap().contains("not found"));

        client.ledger().set_account(
            session,
            AccountInfo {
                data: vec![0; 50],
                owner: PROGRAM,
                lamports: 1,
            },
        );
        let (status, _) = client.respond(&session.to_base58()).await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn test_handle_reconstruct_rejects_bad_endpoint() {
        let request = ReconstructRequest {
            session_address: Address::ZERO.to_base58(),
            rpc_endpoint: Some(String::new()),
        };
        let base = ClientConfig::new("http://localhost:8899", PROGRAM);
        let (status, body) = handle_reconstruct(&request, &base).await;
        assert_eq!(status, 400);
        assert!(body["error"].is_string());
    }

    #[test]
    fn test_connect_rejects_empty_endpoint() {
        let err = Client::connect(ClientConfig::new("  ", PROGRAM)).err().unwrap();
        assert!(matches!(err, ClientError::InvalidConfig(_)));
    }
}
