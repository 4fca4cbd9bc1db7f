//! Table rows from decoded write and edit instructions.
//!
//! Rows keep scan order, which is newest first. Nothing is deduplicated and
//! edits are never folded into the rows they target; they are reported
//! alongside so a caller can apply whatever policy it wants.

use std::collections::BTreeMap;

use serde::Serialize;

use ledgerdb_core::repair::{repair, RAW_FIELD};
use ledgerdb_core::seed::is_hex64;
use ledgerdb_core::{repair_or_raw, EditMethod, LedgerInstruction, Record, Signature};

use crate::decoder::LocatedInstruction;

/// A reconstructed row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    /// Transaction that wrote the row. Edits reference it by this value.
    pub signature: Signature,
    pub slot: u64,
    pub block_time: Option<i64>,
    /// Repaired columns, or `{raw: payload}` when nothing could be recovered.
    pub fields: Record,
    /// Whether `fields` came from structured parsing.
    pub parsed: bool,
}

/// An update or delete referencing an earlier row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEvent {
    pub signature: Signature,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub method: EditMethod,
    /// Signature of the row being edited, as written.
    pub target: String,
    /// Repaired replacement content. Absent for empty content.
    pub fields: Option<Record>,
}

/// Rows and edits for one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableSnapshot {
    pub rows: Vec<Row>,
    pub edits: Vec<EditEvent>,
}

impl TableSnapshot {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.edits.is_empty()
    }
}

/// Snapshots keyed by table name.
pub type Tables = BTreeMap<String, TableSnapshot>;

/// Groups decoded instructions into per-table snapshots.
#[derive(Debug, Clone, Default)]
pub struct RowAssembler {
    only: Option<String>,
}

impl RowAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only instructions naming `table`.
    ///
    /// The name is matched the way it is seeded: surrounding whitespace is
    /// ignored, and a 64-character hex name is a seed already, so nothing is
    /// filtered out.
    pub fn for_table(table: &str) -> Self {
        let table = table.trim();
        let only = (!is_hex64(table)).then(|| table.to_string());
        Self { only }
    }

    fn wants(&self, table: &str) -> bool {
        self.only.as_deref().map_or(true, |only| only == table)
    }

    /// Build snapshots from instructions in scan order.
    pub fn assemble<'a>(
        &self,
        instructions: impl IntoIterator<Item = &'a LocatedInstruction>,
    ) -> Tables {
        let mut tables = Tables::new();

        for located in instructions {
            match &located.instruction {
                LedgerInstruction::Write(write) if self.wants(&write.table_name) => {
                    let (fields, parsed) = normalize(&write.payload);
                    tables
                        .entry(write.table_name.clone())
                        .or_default()
                        .rows
                        .push(Row {
                            signature: located.signature,
                            slot: located.slot,
                            block_time: located.block_time,
                            fields,
                            parsed,
                        });
                }
                LedgerInstruction::Edit(edit) if self.wants(&edit.table_name) => {
                    let fields = if edit.content.trim().is_empty() {
                        None
                    } else {
                        Some(repair_or_raw(&edit.content))
                    };
                    tables
                        .entry(edit.table_name.clone())
                        .or_default()
                        .edits
                        .push(EditEvent {
                            signature: located.signature,
                            slot: located.slot,
                            block_time: located.block_time,
                            method: edit.method.clone(),
                            target: edit.target.clone(),
                            fields,
                        });
                }
                _ => {}
            }
        }

        tables
    }
}

fn normalize(payload: &str) -> (Record, bool) {
    match repair(payload) {
        Some(record) => (record, true),
        None => {
            let mut record = Record::new();
            record.insert(RAW_FIELD.into(), payload.into());
            (record, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerdb_core::{EditPayload, InstructionLocation, WritePayload};
    use serde_json::json;

    fn located(n: u8, instruction: LedgerInstruction) -> LocatedInstruction {
        LocatedInstruction {
            signature: Signature::from_bytes([n; 64]),
            slot: u64::from(n),
            block_time: None,
            location: InstructionLocation {
                outer: 0,
                inner: None,
            },
            instruction,
        }
    }

    fn write(n: u8, table: &str, payload: &str) -> LocatedInstruction {
        located(
            n,
            LedgerInstruction::Write(WritePayload {
                table_name: table.into(),
                payload: payload.into(),
            }),
        )
    }

    #[test]
    fn test_groups_by_table_in_scan_order() {
        let scanned = vec![
            write(3, "users", "{name: 'c'}"),
            write(2, "posts", "{title: 'x'}"),
            write(1, "users", "{name: 'a'}"),
        ];
        let tables = RowAssembler::new().assemble(&scanned);

        let users = &tables["users"];
        assert_eq!(users.rows.len(), 2);
        assert_eq!(users.rows[0].fields["name"], json!("c"));
        assert_eq!(users.rows[1].fields["name"], json!("a"));
        assert_eq!(tables["posts"].rows.len(), 1);
    }

    #[test]
    fn test_unparseable_payload_kept_raw() {
        let tables = RowAssembler::new().assemble(&[write(1, "t", "just words")]);
        let row = &tables["t"].rows[0];
        assert!(!row.parsed);
        assert_eq!(row.fields[RAW_FIELD], json!("just words"));
    }

    #[test]
    fn test_duplicates_not_collapsed() {
        let scanned = vec![write(2, "t", "{a: 1}"), write(1, "t", "{a: 1}")];
        let tables = RowAssembler::new().assemble(&scanned);
        assert_eq!(tables["t"].rows.len(), 2);
    }

    #[test]
    fn test_edits_surfaced_not_folded() {
        let target = Signature::from_bytes([1; 64]).to_base58();
        let scanned = vec![
            located(
                2,
                LedgerInstruction::Edit(EditPayload {
                    table_name: "t".into(),
                    method: EditMethod::Delete,
                    target: target.clone(),
                    content: String::new(),
                }),
            ),
            write(1, "t", "{a: 1}"),
        ];
        let tables = RowAssembler::new().assemble(&scanned);
        let snapshot = &tables["t"];

        assert_eq!(snapshot.rows.len(), 1);
        assert_eq!(snapshot.edits.len(), 1);
        assert_eq!(snapshot.edits[0].target, target);
        assert_eq!(snapshot.edits[0].fields, None);
    }

    #[test]
    fn test_table_filter_and_other_kinds_ignored() {
        let scanned = vec![
            write(3, "a", "{}"),
            write(2, "b", "{}"),
            located(1, LedgerInstruction::Unknown { name: "init".into() }),
        ];
        let tables = RowAssembler::for_table("b").assemble(&scanned);
        assert_eq!(tables.len(), 1);
        assert!(tables.contains_key("b"));
    }

    #[test]
    fn test_table_filter_matches_seeded_name() {
        let scanned = vec![write(2, "users", "{}"), write(1, "posts", "{}")];

        let padded = RowAssembler::for_table("  users\n").assemble(&scanned);
        assert_eq!(padded.len(), 1);
        assert!(padded.contains_key("users"));

        let seeded = RowAssembler::for_table(&ledgerdb_core::seed_hex("users")).assemble(&scanned);
        assert_eq!(seeded.len(), 2);
    }
}
