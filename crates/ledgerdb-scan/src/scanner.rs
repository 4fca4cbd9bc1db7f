//! Backward signature paging and bounded-parallel body fetching.
//!
//! Signatures are listed newest first, one page at a time, using the last
//! signature of the previous page as the cursor. Bodies are then fetched in
//! fixed-size groups: fetches within a group run concurrently, groups run one
//! after another.

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use ledgerdb_core::{Address, Signature, SignatureInfo, TransactionBody};
use ledgerdb_rpc::Ledger;

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};

/// Signatures listed for one address.
#[derive(Debug, Clone, Default)]
pub struct SignatureListing {
    /// Newest first.
    pub signatures: Vec<SignatureInfo>,
    /// Paging stopped early on cancellation.
    pub cancelled: bool,
}

/// Bodies fetched for a list of signatures.
#[derive(Debug, Clone, Default)]
pub struct FetchedBodies {
    /// In the order of the requested signatures.
    pub transactions: Vec<TransactionBody>,
    /// Signatures whose body was absent or failed to fetch.
    pub missing: Vec<Signature>,
    /// Fetching stopped early on cancellation.
    pub cancelled: bool,
}

/// Result of a full scan of one address.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub signatures: Vec<SignatureInfo>,
    pub transactions: Vec<TransactionBody>,
    pub missing_bodies: Vec<Signature>,
    pub cancelled: bool,
}

/// Retrieves transaction history for an address.
pub struct LedgerScanner<L: Ledger> {
    ledger: L,
    config: ScanConfig,
}

impl<L: Ledger> LedgerScanner<L> {
    pub fn new(ledger: L, config: ScanConfig) -> Self {
        Self { ledger, config }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// List up to `max` signatures touching `address`, newest first.
    pub async fn scan_signatures(
        &self,
        address: &Address,
        max: usize,
        cancel: &CancellationToken,
    ) -> Result<SignatureListing> {
        let mut listing = SignatureListing::default();
        let page_size = self.config.page_size.max(1);

        while listing.signatures.len() < max {
            if cancel.is_cancelled() {
                listing.cancelled = true;
                break;
            }

            let limit = page_size.min(max - listing.signatures.len());
            let before = listing.signatures.last().map(|s| s.signature);
            let ledger = &self.ledger;
            let page = self
                .config
                .retry
                .run(cancel, move || async move {
                    Ok(ledger
                        .get_signatures_for_address(address, limit, before.as_ref())
                        .await?)
                })
                .await;

            let page = match page {
                Ok(page) => page,
                Err(ScanError::Cancelled) => {
                    listing.cancelled = true;
                    break;
                }
                Err(e) => return Err(e),
            };

            let exhausted = page.len() < limit;
            listing.signatures.extend(page);
            if exhausted {
                break;
            }
        }

        listing.signatures.truncate(max);
        Ok(listing)
    }

    /// Fetch bodies for `signatures` in groups of the configured batch size.
    ///
    /// An absent body, an RPC error, or a malformed body counts as missing
    /// and does not stop the fetch.
    pub async fn fetch_bodies(
        &self,
        signatures: &[Signature],
        cancel: &CancellationToken,
    ) -> FetchedBodies {
        let mut out = FetchedBodies::default();

        for group in signatures.chunks(self.config.batch_size.max(1)) {
            let fetches = group.iter().map(|sig| self.ledger.get_transaction(sig));

            let results = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    out.cancelled = true;
                    break;
                }
                results = join_all(fetches) => results,
            };

            for (signature, result) in group.iter().zip(results) {
                match result {
                    Ok(Some(body)) => out.transactions.push(body),
                    Ok(None) => {
                        tracing::debug!(%signature, "transaction body unavailable");
                        out.missing.push(*signature);
                    }
                    Err(e) => {
                        tracing::warn!(%signature, error = %e, "transaction fetch failed");
                        out.missing.push(*signature);
                    }
                }
            }
        }

        out
    }

    /// List signatures for `address` and fetch their bodies.
    pub async fn scan(
        &self,
        address: &Address,
        max: usize,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome> {
        let listing = self.scan_signatures(address, max, cancel).await?;
        let wanted: Vec<Signature> = listing.signatures.iter().map(|s| s.signature).collect();
        let fetched = self.fetch_bodies(&wanted, cancel).await;

        tracing::info!(
            %address,
            signatures = listing.signatures.len(),
            transactions = fetched.transactions.len(),
            missing = fetched.missing.len(),
            cancelled = listing.cancelled || fetched.cancelled,
            "scan complete"
        );

        Ok(ScanOutcome {
            signatures: listing.signatures,
            transactions: fetched.transactions,
            missing_bodies: fetched.missing,
            cancelled: listing.cancelled || fetched.cancelled,
        })
    }
}
