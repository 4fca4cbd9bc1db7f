//! # ledgerdb
//!
//! Read relational tables and binary blobs back out of an append-only
//! transaction ledger.
//!
//! ## Overview
//!
//! Nothing is read from mutable state. Rows and blobs are recovered by
//! re-scanning the ledger history of deterministic addresses and decoding
//! the instructions recorded there:
//!
//! - **Addresses**: every (role, owner, name) maps to one program-derived address
//! - **Tables**: write and edit instructions replayed into per-table snapshots
//! - **Blobs**: chunk deposits ordered by index, unwrapped and sniffed
//!
//! ## Key Concepts
//!
//! - **Loose JSON**: row payloads are free-typed text, repaired on read and
//!   never dropped
//! - **Edits**: updates and deletes are new events naming an earlier
//!   transaction; they are reported, not folded
//! - **Absence**: pruned bodies and undecodable instructions are counted,
//!   never fatal
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ledgerdb::{Client, ClientConfig};
//! use ledgerdb::core::Address;
//!
//! async fn example(program_id: Address, owner: &str) {
//!     let config = ClientConfig::new("https://rpc.example.org", program_id);
//!     let client = Client::connect(config).unwrap();
//!
//!     let users = client.read_table(owner, "users").await.unwrap();
//!     println!("{} rows", users.row_count());
//!
//!     // let report = client.reconstruct(session_address).await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `ledgerdb::core` - Pure primitives (addresses, repair, sniffing)
//! - `ledgerdb::rpc` - Ledger trait and implementations
//! - `ledgerdb::scan` - Scanning and assembly pipelines

pub mod client;
pub mod config;
pub mod error;
pub mod report;

// Re-export component crates
pub use ledgerdb_core as core;
pub use ledgerdb_rpc as rpc;
pub use ledgerdb_scan as scan;

// Re-export main types for convenience
pub use client::{handle_reconstruct, Client};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use report::{
    ErrorBody, ReadDiagnostics, ReconstructRequest, ReconstructionReport, ReportMetadata,
    TableRead,
};

pub use ledgerdb_core::{Address, AddressBook, FileType};
pub use ledgerdb_scan::{CancellationToken, ScanConfig, TableSnapshot};
