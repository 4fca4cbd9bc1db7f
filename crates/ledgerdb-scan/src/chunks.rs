//! Blob reconstruction from chunk-deposit instructions.
//!
//! Single pass per request:
//!
//! ```text
//! descriptor -> signatures -> bodies -> deposits -> by index -> concat
//!            -> base64 unwrap -> marker strip -> sniff -> preview
//! ```
//!
//! Chunks are ordered by index only. A later-scanned deposit for an index
//! replaces an earlier one.

use std::collections::BTreeMap;

use bytes::{Bytes, BytesMut};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use ledgerdb_core::sniff::{preview, sniff};
use ledgerdb_core::{postprocess, Address, ChunkDeposit, FileType, Processed, SessionDescriptor};
use ledgerdb_rpc::Ledger;

use crate::error::{Result, ScanError};
use crate::scanner::LedgerScanner;

/// Counters that tell "wrong address" apart from "no data yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkDiagnostics {
    pub signatures_scanned: usize,
    pub transactions_fetched: usize,
    pub instructions_scanned: usize,
    pub instructions_matched: usize,
}

/// A reassembled blob.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub descriptor: SessionDescriptor,
    /// Chunks concatenated in index order, before post-processing.
    pub raw: Bytes,
    pub processed: Processed,
    /// Distinct chunk indices found.
    pub chunks_found: usize,
    /// Indices below the descriptor's total that were never seen, lowest
    /// first, at most [`MAX_LISTED_MISSING`] of them.
    pub missing_indices: Vec<u32>,
    /// How many indices below the descriptor's total were never seen.
    pub missing_count: u32,
    pub file_type: FileType,
    pub preview: Option<String>,
    pub diagnostics: ChunkDiagnostics,
}

impl Reconstruction {
    pub fn is_complete(&self) -> bool {
        self.missing_count == 0
    }
}

/// Cap on the missing indices listed per reconstruction.
pub const MAX_LISTED_MISSING: usize = 1024;

/// Chunks collected by index.
#[derive(Debug, Clone, Default)]
pub struct ChunkSet {
    chunks: BTreeMap<u32, Bytes>,
}

impl ChunkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deposit, replacing any earlier payload for its index.
    pub fn insert(&mut self, deposit: ChunkDeposit) {
        if self.chunks.insert(deposit.index, deposit.data).is_some() {
            tracing::debug!(index = deposit.index, "chunk re-sent, keeping later payload");
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Concatenate in ascending index order.
    pub fn concat(&self) -> Bytes {
        let total = self.chunks.values().map(Bytes::len).sum();
        let mut out = BytesMut::with_capacity(total);
        for chunk in self.chunks.values() {
            out.extend_from_slice(chunk);
        }
        out.freeze()
    }

    /// The first `limit` indices in `0..total` not present, ascending.
    ///
    /// Walks at most `limit + self.len()` indices whatever `total` is.
    pub fn missing(&self, total: u32, limit: usize) -> Vec<u32> {
        (0..total)
            .filter(|i| !self.chunks.contains_key(i))
            .take(limit)
            .collect()
    }

    /// Number of indices in `0..total` not present.
    pub fn missing_count(&self, total: u32) -> u32 {
        let found = self.chunks.range(..total).count() as u32;
        total - found
    }
}

/// Rebuilds blobs from the deposits recorded against a session address.
pub struct ChunkAssembler<'s, L: Ledger> {
    scanner: &'s LedgerScanner<L>,
}

impl<'s, L: Ledger> ChunkAssembler<'s, L> {
    pub fn new(scanner: &'s LedgerScanner<L>) -> Self {
        Self { scanner }
    }

    /// Fetch and parse the session descriptor.
    pub async fn descriptor(
        &self,
        session: &Address,
        cancel: &CancellationToken,
    ) -> Result<SessionDescriptor> {
        let ledger = self.scanner.ledger();
        let account = self
            .scanner
            .config()
            .retry
            .run(cancel, move || async move { Ok(ledger.get_account_info(session).await?) })
            .await?
            .ok_or(ScanError::NotFound(*session))?;

        Ok(SessionDescriptor::parse(&account.data)?)
    }

    /// Reconstruct the blob uploaded under `session`.
    pub async fn reconstruct(
        &self,
        session: &Address,
        cancel: &CancellationToken,
    ) -> Result<Reconstruction> {
        let descriptor = self.descriptor(session, cancel).await?;

        let max = self.scanner.config().max_signatures;
        let outcome = self.scanner.scan(session, max, cancel).await?;
        if outcome.cancelled {
            return Err(ScanError::Cancelled);
        }

        let mut diagnostics = ChunkDiagnostics {
            signatures_scanned: outcome.signatures.len(),
            transactions_fetched: outcome.transactions.len(),
            ..Default::default()
        };

        let mut chunks = ChunkSet::new();
        for body in &outcome.transactions {
            for view in body.all_instructions() {
                diagnostics.instructions_scanned += 1;
                if let Some(deposit) = ChunkDeposit::parse(view.data) {
                    diagnostics.instructions_matched += 1;
                    chunks.insert(deposit);
                }
            }
        }

        if chunks.is_empty() {
            return Err(ScanError::NoChunksFound {
                signatures_scanned: diagnostics.signatures_scanned,
                instructions_scanned: diagnostics.instructions_scanned,
            });
        }

        let missing_count = chunks.missing_count(descriptor.total_chunks);
        let missing_indices = chunks.missing(descriptor.total_chunks, MAX_LISTED_MISSING);
        if missing_count > 0 {
            tracing::warn!(
                %session,
                found = chunks.len(),
                total = descriptor.total_chunks,
                missing = missing_count,
                "incomplete chunk set"
            );
        }

        let raw = chunks.concat();
        let processed = postprocess(&raw);
        let file_type = sniff(&processed.decoded);
        let preview = preview(&processed.decoded);

        tracing::info!(
            %session,
            chunks = chunks.len(),
            bytes = processed.decoded.len(),
            %file_type,
            base64 = processed.base64_wrapped,
            compressed = processed.compressed,
            "blob reconstructed"
        );

        Ok(Reconstruction {
            descriptor,
            raw,
            processed,
            chunks_found: chunks.len(),
            missing_indices,
            missing_count,
            file_type,
            preview,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryPolicy, ScanConfig};
    use ledgerdb_core::{
        AccountInfo, CompiledInstruction, SessionStatus, Signature, TransactionBody,
    };
    use ledgerdb_rpc::MemoryLedger;

    const SESSION: Address = Address::from_bytes([4; 32]);
    const PROGRAM: Address = Address::from_bytes([5; 32]);

    fn deposit(index: u32, data: &'static [u8]) -> ChunkDeposit {
        ChunkDeposit {
            session_id: [0; 16],
            index,
            method: 0,
            data: Bytes::from_static(data),
        }
    }

    #[test]
    fn test_concat_orders_by_index() {
        let mut set = ChunkSet::new();
        set.insert(deposit(2, b"C"));
        set.insert(deposit(0, b"A"));
        set.insert(deposit(1, b"B"));
        assert_eq!(&set.concat()[..], b"ABC");
        assert!(set.missing(3, MAX_LISTED_MISSING).is_empty());
        assert_eq!(set.missing_count(3), 0);
    }

    #[test]
    fn test_later_insert_wins() {
        let mut set = ChunkSet::new();
        set.insert(deposit(0, b"old"));
        set.insert(deposit(0, b"new"));
        assert_eq!(set.len(), 1);
        assert_eq!(&set.concat()[..], b"new");
    }

    #[test]
    fn test_numeric_not_lexical_order() {
        let mut set = ChunkSet::new();
        set.insert(deposit(10, b"k"));
        set.insert(deposit(9, b"j"));
        set.insert(deposit(2, b"c"));
        assert_eq!(&set.concat()[..], b"cjk");
    }

    #[test]
    fn test_missing_indices() {
        let mut set = ChunkSet::new();
        set.insert(deposit(0, b"a"));
        set.insert(deposit(3, b"d"));
        assert_eq!(set.missing(5, MAX_LISTED_MISSING), vec![1, 2, 4]);
        assert_eq!(set.missing(5, 2), vec![1, 2]);
        assert_eq!(set.missing(0, MAX_LISTED_MISSING), Vec::<u32>::new());
        assert_eq!(set.missing_count(5), 3);
        assert_eq!(set.missing_count(0), 0);
    }

    #[test]
    fn test_missing_ignores_indices_past_total() {
        let mut set = ChunkSet::new();
        set.insert(deposit(0, b"a"));
        set.insert(deposit(7, b"h"));
        assert_eq!(set.missing(2, MAX_LISTED_MISSING), vec![1]);
        assert_eq!(set.missing_count(2), 1);
    }

    #[test]
    fn test_missing_is_bounded_for_huge_total() {
        let mut set = ChunkSet::new();
        set.insert(deposit(0, b"a"));
        set.insert(deposit(2, b"c"));
        let missing = set.missing(u32::MAX, MAX_LISTED_MISSING);
        assert_eq!(missing.len(), MAX_LISTED_MISSING);
        assert_eq!(&missing[..3], &[1, 3, 4]);
        assert_eq!(set.missing_count(u32::MAX), u32::MAX - 2);
    }

    fn descriptor_bytes(total_chunks: u32) -> Vec<u8> {
        SessionDescriptor {
            owner: Address::from_bytes([1; 32]),
            session_id: [0; 16],
            total_chunks,
            merkle_root: [0; 32],
            status: SessionStatus::Finalized,
        }
        .to_bytes()
        .to_vec()
    }

    fn ledger_with(descriptor: Vec<u8>, deposits: &[(u32, &'static [u8])]) -> MemoryLedger {
        let ledger = MemoryLedger::new();
        ledger.set_account(
            SESSION,
            AccountInfo {
                data: descriptor,
                owner: PROGRAM,
                lamports: 1,
            },
        );
        for (n, (index, data)) in deposits.iter().enumerate() {
            let body = TransactionBody {
                signature: Signature::from_bytes([n as u8 + 1; 64]),
                slot: 0,
                block_time: None,
                account_keys: vec![SESSION, PROGRAM],
                instructions: vec![CompiledInstruction {
                    program_id_index: 1,
                    accounts: vec![0],
                    data: deposit(*index, data).encode(),
                }],
                inner_instructions: vec![],
            };
            ledger.push_transaction(body, &[SESSION]);
        }
        ledger
    }

    fn scanner(ledger: MemoryLedger) -> LedgerScanner<MemoryLedger> {
        let config = ScanConfig {
            retry: RetryPolicy::none(),
            ..Default::default()
        };
        LedgerScanner::new(ledger, config)
    }

    #[tokio::test]
    async fn test_reconstruct_out_of_order() {
        let scanner = scanner(ledger_with(
            descriptor_bytes(3),
            &[(2, b"C"), (0, b"A"), (1, b"B")],
        ));
        let out = ChunkAssembler::new(&scanner)
            .reconstruct(&SESSION, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(&out.raw[..], b"ABC");
        assert_eq!(out.chunks_found, 3);
        assert!(out.is_complete());
        assert_eq!(out.diagnostics.instructions_matched, 3);
        assert_eq!(out.file_type, FileType::Txt);
    }

    #[tokio::test]
    async fn test_missing_descriptor_is_not_found() {
        let scanner = scanner(MemoryLedger::new());
        let err = ChunkAssembler::new(&scanner)
            .reconstruct(&SESSION, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::NotFound(addr) if addr == SESSION));
    }

    #[tokio::test]
    async fn test_short_descriptor_is_malformed() {
        let scanner = scanner(ledger_with(vec![0; 50], &[(0, b"A")]));
        let err = ChunkAssembler::new(&scanner)
            .reconstruct(&SESSION, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::Malformed {
                expected: 85,
                actual: 50
            }
        ));
    }

    #[tokio::test]
    async fn test_incomplete_set_reports_missing() {
        let scanner = scanner(ledger_with(descriptor_bytes(4), &[(0, b"A"), (3, b"D")]));
        let out = ChunkAssembler::new(&scanner)
            .reconstruct(&SESSION, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.missing_indices, vec![1, 2]);
        assert_eq!(out.missing_count, 2);
        assert!(!out.is_complete());
        assert_eq!(&out.raw[..], b"AD");
    }

    #[tokio::test]
    async fn test_oversized_total_lists_bounded_missing() {
        let scanner = scanner(ledger_with(
            descriptor_bytes(u32::MAX),
            &[(0, b"A"), (1, b"B")],
        ));
        let out = ChunkAssembler::new(&scanner)
            .reconstruct(&SESSION, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.chunks_found, 2);
        assert_eq!(out.missing_count, u32::MAX - 2);
        assert_eq!(out.missing_indices.len(), MAX_LISTED_MISSING);
        assert_eq!(out.missing_indices[0], 2);
        assert!(!out.is_complete());
        assert_eq!(&out.raw[..], b"AB");
    }

    #[tokio::test]
    async fn test_cancelled_reconstruct() {
        let scanner = scanner(ledger_with(descriptor_bytes(1), &[(0, b"A")]));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = ChunkAssembler::new(&scanner)
            .reconstruct(&SESSION, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Cancelled));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_found_and_missing_partition_total(
                total in 1u32..64,
                indices in proptest::collection::vec(0u32..64, 0..64),
            ) {
                let mut set = ChunkSet::new();
                for index in indices.iter().copied().filter(|i| *i < total) {
                    set.insert(deposit(index, b"x"));
                }
                let missing = set.missing(total, MAX_LISTED_MISSING);
                prop_assert_eq!(set.len() + missing.len(), total as usize);
                prop_assert_eq!(missing.len() as u32, set.missing_count(total));
                prop_assert!(missing.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
