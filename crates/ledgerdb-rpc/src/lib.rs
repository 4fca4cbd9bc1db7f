//! # ledgerdb RPC
//!
//! Ledger query abstraction for ledgerdb. Provides a trait-based interface
//! over account state and transaction history with JSON-RPC and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`Ledger`] - The async trait for all ledger queries
//! - [`HttpLedger`] - JSON-RPC 2.0 client over HTTP
//! - [`MemoryLedger`] - In-memory ledger for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ledgerdb_rpc::{HttpLedger, Ledger};
//! use ledgerdb_core::Address;
//!
//! async fn example(account: Address) {
//!     let ledger = HttpLedger::new("https://rpc.example.org", Duration::from_secs(30)).unwrap();
//!     let page = ledger.get_signatures_for_address(&account, 100, None).await.unwrap();
//!     for entry in page {
//!         let _body = ledger.get_transaction(&entry.signature).await.unwrap();
//!     }
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Absence is data**: pruned accounts and transactions come back as `None`
//! - **Malformed bodies**: a transaction that fails to parse is logged and treated as absent

pub mod error;
pub mod http;
pub mod memory;
pub mod traits;

pub use error::{LedgerError, Result};
pub use http::HttpLedger;
pub use memory::MemoryLedger;
pub use traits::Ledger;
