//! # ledgerdb Core
//!
//! Pure primitives for reading tables and blobs back out of a transaction
//! ledger: address derivation, instruction decoding, loose JSON repair,
//! blob post-processing and file-type sniffing.
//!
//! This crate contains no I/O. Everything here is a deterministic function
//! of its inputs.
//!
//! ## Key Types
//!
//! - [`Address`] - 32-byte account key, base58 on the wire
//! - [`AddressDeriver`] - maps (role, owner, name) to a program-derived address
//! - [`LedgerInstruction`] - tagged union of the instruction kinds the reader understands
//! - [`SessionDescriptor`] - fixed-layout blob upload session
//! - [`FileType`] - result of magic-byte sniffing
//!
//! ## Loose JSON
//!
//! Row payloads are free-typed text. See the [`repair`] module for the
//! ordered repair pipeline.

pub mod address;
pub mod blob;
pub mod descriptor;
pub mod error;
pub mod instruction;
pub mod ledger;
pub mod repair;
pub mod schema;
pub mod seed;
pub mod sniff;

pub use address::{
    derive, extension_table_name, Address, AddressBook, AddressDeriver, DerivedAddress, Namespace,
};
pub use blob::{postprocess, Processed};
pub use descriptor::{SessionDescriptor, SessionStatus, DESCRIPTOR_LEN};
pub use error::{CoreError, Result};
pub use instruction::{
    ChunkDeposit, EditMethod, EditPayload, FieldAlias, LedgerInstruction, WritePayload,
    CHUNK_DEPOSIT_DISCRIMINATOR,
};
pub use ledger::{
    AccountInfo, CompiledInstruction, InnerInstructions, InstructionLocation, InstructionView,
    Signature, SignatureInfo, TransactionBody,
};
pub use repair::{repair, repair_or_raw, repair_or_value, Record};
pub use schema::{DecodedInstruction, FieldDef, FieldType, FieldValue, InstructionDef, InstructionSchema};
pub use seed::{seed, seed_hex};
pub use sniff::{preview, sniff, FileType};
