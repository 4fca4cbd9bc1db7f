//! In-memory implementation of the Ledger trait.
//!
//! This is primarily for testing. Paging and absence semantics match the
//! JSON-RPC ledger, and faults can be injected per signature.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use ledgerdb_core::{AccountInfo, Address, Signature, SignatureInfo, TransactionBody};

use crate::error::{LedgerError, Result};
use crate::traits::Ledger;

/// In-memory ledger.
///
/// Thread-safe via RwLock. Transactions pushed later are newer.
pub struct MemoryLedger {
    inner: RwLock<MemoryLedgerInner>,
    transaction_fetches: AtomicUsize,
}

#[derive(Default)]
struct MemoryLedgerInner {
    /// Account states.
    accounts: HashMap<Address, AccountInfo>,

    /// Per-address signature index, newest first.
    history: HashMap<Address, Vec<SignatureInfo>>,

    /// Transaction bodies by signature.
    transactions: HashMap<Signature, TransactionBody>,

    /// Signatures whose fetch returns an RPC error.
    failing: HashSet<Signature>,

    /// Next slot to assign.
    next_slot: u64,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryLedgerInner {
                next_slot: 1,
                ..Default::default()
            }),
            transaction_fetches: AtomicUsize::new(0),
        }
    }

    /// Set or replace an account.
    pub fn set_account(&self, address: Address, account: AccountInfo) {
        let mut inner = self.inner.write().unwrap();
        inner.accounts.insert(address, account);
    }

    /// Append a transaction as the newest entry for each of `touched`.
    ///
    /// The body's slot is overwritten with a monotonically increasing value.
    pub fn push_transaction(&self, mut body: TransactionBody, touched: &[Address]) -> Signature {
        let mut inner = self.inner.write().unwrap();
        let slot = inner.next_slot;
        inner.next_slot += 1;
        body.slot = slot;

        let info = SignatureInfo {
            signature: body.signature,
            slot,
            block_time: body.block_time,
            failed: false,
        };
        for address in touched {
            inner.history.entry(*address).or_default().insert(0, info.clone());
        }
        let signature = body.signature;
        inner.transactions.insert(signature, body);
        signature
    }

    /// List a signature for `address` without any retrievable body, as a
    /// pruned ledger would.
    pub fn push_signature_only(&self, address: Address, signature: Signature) {
        let mut inner = self.inner.write().unwrap();
        let slot = inner.next_slot;
        inner.next_slot += 1;
        inner.history.entry(address).or_default().insert(
            0,
            SignatureInfo {
                signature,
                slot,
                block_time: None,
                failed: false,
            },
        );
    }

    /// Make fetching `signature` fail with an RPC error.
    pub fn fail_transaction(&self, signature: Signature) {
        let mut inner = self.inner.write().unwrap();
        inner.failing.insert(signature);
    }

    /// Number of `get_transaction` calls served so far.
    pub fn transaction_fetches(&self) -> usize {
        self.transaction_fetches.load(Ordering::SeqCst)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn get_account_info(&self, address: &Address) -> Result<Option<AccountInfo>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.accounts.get(address).cloned())
    }

    async fn get_signatures_for_address(
        &self,
        address: &Address,
        limit: usize,
        before: Option<&Signature>,
    ) -> Result<Vec<SignatureInfo>> {
        let inner = self.inner.read().unwrap();
        let Some(history) = inner.history.get(address) else {
            return Ok(Vec::new());
        };

        let start = match before {
            Some(cursor) => match history.iter().position(|s| &s.signature == cursor) {
                Some(pos) => pos + 1,
                None => return Ok(Vec::new()),
            },
            None => 0,
        };

        Ok(history.iter().skip(start).take(limit).cloned().collect())
    }

    async fn get_transaction(&self, signature: &Signature) -> Result<Option<TransactionBody>> {
        self.transaction_fetches.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.read().unwrap();
        if inner.failing.contains(signature) {
            return Err(LedgerError::Rpc {
                code: -32009,
                message: format!("transaction {signature} unavailable"),
            });
        }
        Ok(inner.transactions.get(signature).cloned())
    }
}
