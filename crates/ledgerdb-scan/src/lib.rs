//! # ledgerdb Scan
//!
//! I/O pipelines that rebuild tables and blobs from ledger history.
//!
//! ## Overview
//!
//! Everything here runs over an abstract [`Ledger`](ledgerdb_rpc::Ledger).
//! The [`LedgerScanner`] pages signatures backward from the ledger tip and
//! fetches bodies in bounded groups. The [`InstructionDecoder`] pulls one
//! program's instructions out of those bodies. From there either the
//! [`RowAssembler`] builds per-table snapshots or the [`ChunkAssembler`]
//! rebuilds an uploaded blob.
//!
//! ## Pipeline
//!
//! ```text
//! address --scan--> signatures --fetch--> bodies
//!                                           |
//!              +----------------------------+
//!              |                            |
//!         decode (program)             deposits (any)
//!              |                            |
//!         RowAssembler                 ChunkAssembler
//!              |                            |
//!           Tables                   Reconstruction
//! ```
//!
//! ## Failure Policy
//!
//! - **Per-instruction**: decode failures are counted and logged, never raised
//! - **Per-body**: absent or failing bodies are reported as missing
//! - **Terminal**: `NotFound`, `Malformed`, `NoChunksFound`, `Cancelled`
//!
//! ## Cancellation
//!
//! Every pipeline takes a `CancellationToken`. A cancelled scan stops paging,
//! abandons the in-flight group and keeps what it already has.

pub mod chunks;
pub mod config;
pub mod decoder;
pub mod error;
pub mod rows;
pub mod scanner;

pub use chunks::{ChunkAssembler, ChunkDiagnostics, ChunkSet, Reconstruction, MAX_LISTED_MISSING};
pub use config::{RetryPolicy, ScanConfig};
pub use decoder::{DecodeCounts, DecodeOutcome, InstructionDecoder, LocatedInstruction};
pub use error::{Result, ScanError};
pub use rows::{EditEvent, Row, RowAssembler, TableSnapshot, Tables};
pub use scanner::{FetchedBodies, LedgerScanner, ScanOutcome, SignatureListing};

pub use tokio_util::sync::CancellationToken;
