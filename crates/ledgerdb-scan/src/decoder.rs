//! Instruction extraction for one program.
//!
//! Every top-level and inner instruction executed by the target program is
//! classified against the schema. An instruction that fails to decode is
//! counted and logged, never surfaced.

use serde::Serialize;

use ledgerdb_core::{
    Address, InstructionLocation, InstructionSchema, LedgerInstruction, Signature,
    TransactionBody,
};

/// A classified instruction with its position in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedInstruction {
    pub signature: Signature,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub location: InstructionLocation,
    pub instruction: LedgerInstruction,
}

/// Instructions recovered from one or more transactions.
#[derive(Debug, Clone, Default)]
pub struct DecodeOutcome {
    pub instructions: Vec<LocatedInstruction>,
    pub counts: DecodeCounts,
}

/// Per-scan decode counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeCounts {
    /// Instructions executed by the target program.
    pub scanned: usize,
    /// Of those, instructions that could not be decoded.
    pub skipped: usize,
}

impl DecodeOutcome {
    fn merge(&mut self, other: DecodeOutcome) {
        self.instructions.extend(other.instructions);
        self.counts.scanned += other.counts.scanned;
        self.counts.skipped += other.counts.skipped;
    }
}

/// Decodes a program's instructions out of transaction bodies.
#[derive(Debug, Clone)]
pub struct InstructionDecoder {
    program_id: Address,
    schema: InstructionSchema,
}

impl InstructionDecoder {
    pub fn new(program_id: Address, schema: InstructionSchema) -> Self {
        Self { program_id, schema }
    }

    pub fn program_id(&self) -> &Address {
        &self.program_id
    }

    pub fn schema(&self) -> &InstructionSchema {
        &self.schema
    }

    /// Decode the target program's instructions in one transaction.
    pub fn decode_transaction(&self, body: &TransactionBody) -> DecodeOutcome {
        let mut out = DecodeOutcome::default();

        for view in body.program_instructions(&self.program_id) {
            out.counts.scanned += 1;
            match LedgerInstruction::classify(view.data, &self.schema) {
                Some(instruction) => out.instructions.push(LocatedInstruction {
                    signature: body.signature,
                    slot: body.slot,
                    block_time: body.block_time,
                    location: view.location,
                    instruction,
                }),
                None => {
                    out.counts.skipped += 1;
                    tracing::debug!(
                        signature = %body.signature,
                        outer = view.location.outer,
                        inner = ?view.location.inner,
                        len = view.data.len(),
                        "instruction skipped: no matching definition"
                    );
                }
            }
        }

        out
    }

    /// Decode a sequence of transactions, preserving their order.
    pub fn decode_all<'a>(
        &self,
        bodies: impl IntoIterator<Item = &'a TransactionBody>,
    ) -> DecodeOutcome {
        let mut out = DecodeOutcome::default();
        for body in bodies {
            out.merge(self.decode_transaction(body));
        }
        out
    }
}
