//! The closed set of instruction kinds the reader understands.
//!
//! Writers have shipped several field-naming conventions over time
//! (`table_name` vs `tableName`, ...). Every logical field is resolved
//! through a [`FieldAlias`]: an ordered list of candidate names, first match
//! wins, with a positional fallback when no name matches.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::schema::{DecodedInstruction, FieldValue, InstructionSchema};

/// Discriminator byte of a chunk-deposit instruction.
pub const CHUNK_DEPOSIT_DISCRIMINATOR: u8 = 0x02;

/// Session id length inside a deposit.
pub const SESSION_ID_LEN: usize = 16;

/// Minimum deposit length: discriminator, session id, index, method byte.
pub const CHUNK_DEPOSIT_HEADER_LEN: usize = 1 + SESSION_ID_LEN + 4 + 1;

/// An ordered list of candidate names for one logical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAlias {
    pub names: &'static [&'static str],
    pub position: Option<usize>,
}

impl FieldAlias {
    pub const fn new(names: &'static [&'static str], position: Option<usize>) -> Self {
        Self { names, position }
    }

    /// Resolve against a decoded instruction: named lookup in order, then
    /// positional.
    pub fn resolve<'a>(&self, ix: &'a DecodedInstruction) -> Option<&'a FieldValue> {
        self.names
            .iter()
            .find_map(|name| ix.get(name))
            .or_else(|| self.position.and_then(|p| ix.get_index(p)))
    }

    /// Resolve to text.
    pub fn resolve_text(&self, ix: &DecodedInstruction) -> Option<String> {
        self.resolve(ix).map(FieldValue::to_text)
    }

    /// Whether `name` is one of the candidates.
    pub fn matches(&self, name: &str) -> bool {
        self.names.contains(&name)
    }
}

/// Field and instruction-name aliases.
pub mod aliases {
    use super::FieldAlias;

    pub const WRITE_INSTRUCTION: FieldAlias =
        FieldAlias::new(&["write_data", "writeData", "write_row", "writeRow"], None);

    pub const EDIT_INSTRUCTION: FieldAlias = FieldAlias::new(
        &["database_instruction", "databaseInstruction", "edit_data", "editData"],
        None,
    );

    pub const TABLE_NAME: FieldAlias =
        FieldAlias::new(&["table_name", "tableName", "table"], Some(0));

    pub const WRITE_PAYLOAD: FieldAlias = FieldAlias::new(
        &["row_json_tx", "rowJsonTx", "row_json", "rowJson", "data", "payload"],
        Some(1),
    );

    pub const EDIT_METHOD: FieldAlias = FieldAlias::new(&["method", "op"], Some(1));

    pub const EDIT_TARGET: FieldAlias = FieldAlias::new(
        &["target_tx", "targetTx", "target_signature", "targetSignature"],
        Some(2),
    );

    pub const EDIT_CONTENT: FieldAlias =
        FieldAlias::new(&["content", "row_json_tx", "rowJsonTx", "data"], Some(3));
}

/// A row write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritePayload {
    pub table_name: String,
    pub payload: String,
}

/// Kind of edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMethod {
    Update,
    Delete,
    Other(String),
}

impl EditMethod {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "update" | "edit" => EditMethod::Update,
            "delete" | "remove" => EditMethod::Delete,
            _ => EditMethod::Other(s.trim().to_string()),
        }
    }
}

/// An edit referencing an earlier write by its transaction signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPayload {
    pub table_name: String,
    pub method: EditMethod,
    pub target: String,
    pub content: String,
}

/// One chunk of a blob upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDeposit {
    pub session_id: [u8; SESSION_ID_LEN],
    pub index: u32,
    pub method: u8,
    pub data: Bytes,
}

impl ChunkDeposit {
    /// Parse a deposit; `None` if `data` does not qualify.
    ///
    /// Everything after the method byte is chunk payload: the instruction
    /// boundary is the chunk boundary.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < CHUNK_DEPOSIT_HEADER_LEN || data[0] != CHUNK_DEPOSIT_DISCRIMINATOR {
            return None;
        }
        let mut session_id = [0u8; SESSION_ID_LEN];
        session_id.copy_from_slice(&data[1..1 + SESSION_ID_LEN]);
        let idx_at = 1 + SESSION_ID_LEN;
        let index = u32::from_le_bytes(data[idx_at..idx_at + 4].try_into().ok()?);
        let method = data[idx_at + 4];

        Some(Self {
            session_id,
            index,
            method,
            data: Bytes::copy_from_slice(&data[CHUNK_DEPOSIT_HEADER_LEN..]),
        })
    }

    /// Encode back to instruction data.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CHUNK_DEPOSIT_HEADER_LEN + self.data.len());
        out.push(CHUNK_DEPOSIT_DISCRIMINATOR);
        out.extend_from_slice(&self.session_id);
        out.extend_from_slice(&self.index.to_le_bytes());
        out.push(self.method);
        out.extend_from_slice(&self.data);
        out
    }
}

/// A classified instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerInstruction {
    Write(WritePayload),
    Edit(EditPayload),
    ChunkDeposit(ChunkDeposit),
    /// Decoded, but not a kind this reader handles.
    Unknown { name: String },
}

impl LedgerInstruction {
    /// Classify a schema-decoded instruction.
    ///
    /// Write and edit instructions missing their table name or payload
    /// degrade to `Unknown`.
    pub fn from_decoded(ix: &DecodedInstruction) -> Self {
        let unknown = || LedgerInstruction::Unknown {
            name: ix.name.clone(),
        };

        if aliases::WRITE_INSTRUCTION.matches(&ix.name) {
            let (Some(table_name), Some(payload)) = (
                aliases::TABLE_NAME.resolve_text(ix),
                aliases::WRITE_PAYLOAD.resolve_text(ix),
            ) else {
                return unknown();
            };
            return LedgerInstruction::Write(WritePayload {
                table_name,
                payload,
            });
        }

        if aliases::EDIT_INSTRUCTION.matches(&ix.name) {
            let (Some(table_name), Some(target)) = (
                aliases::TABLE_NAME.resolve_text(ix),
                aliases::EDIT_TARGET.resolve_text(ix),
            ) else {
                return unknown();
            };
            let method = aliases::EDIT_METHOD
                .resolve_text(ix)
                .map(|m| EditMethod::parse(&m))
                .unwrap_or(EditMethod::Update);
            let content = aliases::EDIT_CONTENT.resolve_text(ix).unwrap_or_default();
            return LedgerInstruction::Edit(EditPayload {
                table_name,
                method,
                target,
                content,
            });
        }

        unknown()
    }

    /// Classify raw instruction data: schema first, then the chunk-deposit
    /// layout. `None` means neither recognised it.
    pub fn classify(data: &[u8], schema: &InstructionSchema) -> Option<Self> {
        match schema.decode(data) {
            Ok(decoded) => Some(Self::from_decoded(&decoded)),
            Err(_) => ChunkDeposit::parse(data).map(LedgerInstruction::ChunkDeposit),
        }
    }

    /// Table name and payload string for row-bearing kinds.
    pub fn table_payload(&self) -> Option<(&str, &str)> {
        match self {
            LedgerInstruction::Write(w) => Some((&w.table_name, &w.payload)),
            LedgerInstruction::Edit(e) => Some((&e.table_name, &e.content)),
            _ => None,
        }
    }
}
