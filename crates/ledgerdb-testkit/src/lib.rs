//! # ledgerdb Testkit
//!
//! Testing utilities for ledgerdb.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: seeds and discriminators every reader must agree on
//! - **Generators**: Proptest strategies for names, records and upload orders
//! - **Fixtures**: an in-memory ledger pre-loaded with table and upload history
//!
//! ## Golden Vectors
//!
//! ```rust
//! use ledgerdb_testkit::vectors::verify_all;
//!
//! for (name, matches, actual) in verify_all() {
//!     assert!(matches, "{name}: {actual}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use ledgerdb_testkit::generators::UploadPlan;
//!
//! proptest! {
//!     #[test]
//!     fn any_order_reassembles(plan: UploadPlan) {
//!         // deposit plan.order, then compare against plan.payload
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use ledgerdb_core::Address;
//! use ledgerdb_testkit::fixtures::LedgerFixture;
//!
//! let fixture = LedgerFixture::new();
//! let session = Address::from_bytes([3; 32]);
//! fixture.upload(session, b"ABC", 1, &[2, 0, 1]);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{LedgerFixture, FIXTURE_OWNER, FIXTURE_PROGRAM};
pub use generators::UploadPlan;
