//! Ledger trait: the abstract query interface over transaction history.
//!
//! Any ledger that can answer these three calls can back a reader.
//! Implementations include a JSON-RPC client and an in-memory ledger for
//! tests.

use std::sync::Arc;

use async_trait::async_trait;
use ledgerdb_core::{AccountInfo, Address, Signature, SignatureInfo, TransactionBody};

use crate::error::Result;

/// Async interface for ledger queries.
///
/// # Design Notes
///
/// - **Newest first**: signature listings run backward from the ledger tip.
/// - **Cursor paging**: `before` names the last signature of the previous
///   page; results start strictly after it.
/// - **Absence is not an error**: a missing account or transaction is
///   `Ok(None)`. Ledgers prune old data.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Fetch an account's current state.
    async fn get_account_info(&self, address: &Address) -> Result<Option<AccountInfo>>;

    /// List up to `limit` signatures touching `address`, newest first,
    /// starting after `before` when given.
    async fn get_signatures_for_address(
        &self,
        address: &Address,
        limit: usize,
        before: Option<&Signature>,
    ) -> Result<Vec<SignatureInfo>>;

    /// Fetch one transaction body.
    async fn get_transaction(&self, signature: &Signature) -> Result<Option<TransactionBody>>;
}

#[async_trait]
impl<L: Ledger + ?Sized> Ledger for Arc<L> {
    async fn get_account_info(&self, address: &Address) -> Result<Option<AccountInfo>> {
        (**self).get_account_info(address).await
    }

    async fn get_signatures_for_address(
        &self,
        address: &Address,
        limit: usize,
        before: Option<&Signature>,
    ) -> Result<Vec<SignatureInfo>> {
        (**self)
            .get_signatures_for_address(address, limit, before)
            .await
    }

    async fn get_transaction(&self, signature: &Signature) -> Result<Option<TransactionBody>> {
        (**self).get_transaction(signature).await
    }
}
