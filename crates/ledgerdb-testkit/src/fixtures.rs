//! Ledger scenarios for tests.
//!
//! A [`LedgerFixture`] owns an in-memory ledger and writes the transactions a
//! table program and an upload client would have produced: row writes, edits,
//! session descriptors and chunk deposits, plus unrelated noise.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use ledgerdb_core::instruction::SESSION_ID_LEN;
use ledgerdb_core::{
    AccountInfo, Address, AddressDeriver, ChunkDeposit, CompiledInstruction, FieldValue,
    InstructionSchema, SessionDescriptor, SessionStatus, Signature, TransactionBody,
};
use ledgerdb_rpc::MemoryLedger;

/// Program id used when none is given.
pub const FIXTURE_PROGRAM: Address = Address::from_bytes([7; 32]);

/// Owner key used when none is given.
pub const FIXTURE_OWNER: Address = Address::from_bytes([1; 32]);

/// Builds ledger history for one program.
pub struct LedgerFixture {
    ledger: Arc<MemoryLedger>,
    program_id: Address,
    owner: Address,
    schema: InstructionSchema,
    next_signature: AtomicU64,
}

impl LedgerFixture {
    pub fn new() -> Self {
        Self::with_program(FIXTURE_PROGRAM)
    }

    pub fn with_program(program_id: Address) -> Self {
        Self {
            ledger: Arc::new(MemoryLedger::new()),
            program_id,
            owner: FIXTURE_OWNER,
            schema: InstructionSchema::standard(),
            next_signature: AtomicU64::new(1),
        }
    }

    /// A shared handle to the ledger, usable anywhere a `Ledger` is.
    pub fn ledger(&self) -> Arc<MemoryLedger> {
        Arc::clone(&self.ledger)
    }

    pub fn program_id(&self) -> Address {
        self.program_id
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn deriver(&self) -> AddressDeriver {
        AddressDeriver::new(self.program_id)
    }

    /// A fresh signature, unique within this fixture.
    pub fn next_signature(&self) -> Signature {
        let n = self.next_signature.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; 64];
        bytes[0] = 0x5a;
        bytes[1..9].copy_from_slice(&n.to_le_bytes());
        Signature::from_bytes(bytes)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Raw transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Record one instruction invoked on `program`, listed under `touched`.
    pub fn push_instruction(&self, program: Address, data: Vec<u8>, touched: &[Address]) -> Signature {
        let mut account_keys = vec![self.owner, program];
        account_keys.extend_from_slice(touched);
        let accounts = (2..account_keys.len() as u8).collect();

        let body = TransactionBody {
            signature: self.next_signature(),
            slot: 0,
            block_time: Some(1_700_000_000),
            account_keys,
            instructions: vec![CompiledInstruction {
                program_id_index: 1,
                accounts,
                data,
            }],
            inner_instructions: vec![],
        };
        self.ledger.push_transaction(body, touched)
    }

    /// `count` transactions under `address` that carry nothing readable.
    pub fn push_noise(&self, address: Address, count: usize) -> Vec<Signature> {
        let other = Address::from_bytes([0xee; 32]);
        (0..count)
            .map(|i| self.push_instruction(other, vec![0xff, i as u8, 0, 0], &[address]))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tables
    // ─────────────────────────────────────────────────────────────────────────

    /// A `write_data` instruction for `table`, listed under `address`.
    pub fn write_row(&self, address: Address, table: &str, payload: &str) -> Signature {
        let data = self.encode(
            "write_data",
            &[
                FieldValue::String(table.into()),
                FieldValue::String(payload.into()),
            ],
        );
        self.push_instruction(self.program_id, data, &[address])
    }

    /// A `database_instruction` edit for `table`, listed under `address`.
    pub fn edit_row(
        &self,
        address: Address,
        table: &str,
        method: &str,
        target: &str,
        content: &str,
    ) -> Signature {
        let data = self.encode(
            "database_instruction",
            &[
                FieldValue::String(table.into()),
                FieldValue::String(method.into()),
                FieldValue::String(target.into()),
                FieldValue::String(content.into()),
            ],
        );
        self.push_instruction(self.program_id, data, &[address])
    }

    fn encode(&self, name: &str, values: &[FieldValue]) -> Vec<u8> {
        match self.schema.find(name) {
            Some(def) => def.encode(values),
            None => panic!("standard schema has no {name}"),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Uploads
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a descriptor account at `session`.
    pub fn open_session(
        &self,
        session: Address,
        session_id: [u8; SESSION_ID_LEN],
        total_chunks: u32,
    ) -> SessionDescriptor {
        let descriptor = SessionDescriptor {
            owner: self.owner,
            session_id,
            total_chunks,
            merkle_root: [0xab; 32],
            status: SessionStatus::Finalized,
        };
        self.ledger.set_account(
            session,
            AccountInfo {
                data: descriptor.to_bytes().to_vec(),
                owner: self.program_id,
                lamports: 1_000_000,
            },
        );
        descriptor
    }

    /// Store arbitrary bytes at `session` in place of a descriptor.
    pub fn set_session_data(&self, session: Address, data: Vec<u8>) {
        self.ledger.set_account(
            session,
            AccountInfo {
                data,
                owner: self.program_id,
                lamports: 1,
            },
        );
    }

    /// One chunk deposit listed under `session`.
    pub fn deposit(
        &self,
        session: Address,
        session_id: [u8; SESSION_ID_LEN],
        index: u32,
        data: &[u8],
    ) -> Signature {
        let deposit = ChunkDeposit {
            session_id,
            index,
            method: 0,
            data: Bytes::copy_from_slice(data),
        };
        self.push_instruction(self.program_id, deposit.encode(), &[session])
    }

    /// Open a session for `payload` and deposit its chunks in `order`.
    ///
    /// `order` lists chunk indices; indices may repeat or be left out.
    pub fn upload(
        &self,
        session: Address,
        payload: &[u8],
        chunk_size: usize,
        order: &[u32],
    ) -> SessionDescriptor {
        let chunks = split(payload, chunk_size);
        let session_id = [0x42; SESSION_ID_LEN];
        let descriptor = self.open_session(session, session_id, chunks.len() as u32);
        for &index in order {
            if let Some(chunk) = chunks.get(index as usize) {
                self.deposit(session, session_id, index, chunk);
            }
        }
        descriptor
    }

    /// Upload `payload` with chunks deposited in index order.
    pub fn upload_in_order(&self, session: Address, payload: &[u8], chunk_size: usize) -> SessionDescriptor {
        let count = split(payload, chunk_size).len() as u32;
        let order: Vec<u32> = (0..count).collect();
        self.upload(session, payload, chunk_size, &order)
    }
}

impl Default for LedgerFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `payload` into chunks of at most `chunk_size` bytes.
pub fn split(payload: &[u8], chunk_size: usize) -> Vec<&[u8]> {
    payload.chunks(chunk_size.max(1)).collect()
}
