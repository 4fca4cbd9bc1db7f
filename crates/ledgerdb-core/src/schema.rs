//! Instruction schemas and field decoding.
//!
//! An instruction on the wire is an 8-byte discriminator followed by its
//! fields in declaration order. Integers are little-endian; strings and byte
//! vectors carry a `u32` length prefix.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::{Address, ADDRESS_LEN};
use crate::error::{CoreError, Result};

/// Length of an instruction discriminator.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Upper bound on a single length-prefixed field.
const MAX_FIELD_LEN: usize = 10 * 1024 * 1024;

/// Compute the discriminator for an instruction name.
pub fn discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("global:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

/// Wire type of an instruction field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Bytes,
    U8,
    U16,
    U32,
    U64,
    I64,
    Bool,
    Pubkey,
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Bytes(Vec<u8>),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I64(i64),
    Bool(bool),
    Pubkey(Address),
}

impl FieldValue {
    /// Borrow as a string if this is a string field.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Best-effort textual form: strings as-is, bytes as lossy UTF-8,
    /// everything else through `Display`-like formatting.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            FieldValue::U8(v) => v.to_string(),
            FieldValue::U16(v) => v.to_string(),
            FieldValue::U32(v) => v.to_string(),
            FieldValue::U64(v) => v.to_string(),
            FieldValue::I64(v) => v.to_string(),
            FieldValue::Bool(v) => v.to_string(),
            FieldValue::Pubkey(a) => a.to_base58(),
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            FieldValue::String(s) => {
                out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            FieldValue::Bytes(b) => {
                out.extend_from_slice(&(b.len() as u32).to_le_bytes());
                out.extend_from_slice(b);
            }
            FieldValue::U8(v) => out.push(*v),
            FieldValue::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::Bool(v) => out.push(u8::from(*v)),
            FieldValue::Pubkey(a) => out.extend_from_slice(a.as_bytes()),
        }
    }
}

/// A named field in an instruction definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// One instruction in a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl InstructionDef {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn discriminator(&self) -> [u8; DISCRIMINATOR_LEN] {
        discriminator(&self.name)
    }

    /// Encode instruction data for the given values, in field order.
    pub fn encode(&self, values: &[FieldValue]) -> Vec<u8> {
        let mut out = self.discriminator().to_vec();
        for value in values {
            value.encode_into(&mut out);
        }
        out
    }

    fn decode_fields(&self, body: &[u8]) -> Result<Vec<(String, FieldValue)>> {
        let mut reader = Reader::new(body);
        let mut fields = Vec::with_capacity(self.fields.len());
        for def in &self.fields {
            let value = reader.read(def.ty).map_err(|e| {
                CoreError::DecodingError(format!("{}.{}: {e}", self.name, def.name))
            })?;
            fields.push((def.name.clone(), value));
        }
        Ok(fields)
    }
}

/// A decoded instruction: its name plus fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedInstruction {
    pub name: String,
    pub fields: Vec<(String, FieldValue)>,
}

impl DecodedInstruction {
    /// Look up a field by exact name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Look up a field by position.
    pub fn get_index(&self, index: usize) -> Option<&FieldValue> {
        self.fields.get(index).map(|(_, v)| v)
    }
}

/// A set of instruction definitions to decode against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstructionSchema {
    pub instructions: Vec<InstructionDef>,
}

impl InstructionSchema {
    pub fn new(instructions: Vec<InstructionDef>) -> Self {
        Self { instructions }
    }

    /// The table program's write and edit instructions.
    pub fn standard() -> Self {
        use FieldType::String as S;
        Self::new(vec![
            InstructionDef::new(
                "write_data",
                vec![FieldDef::new("table_name", S), FieldDef::new("row_json_tx", S)],
            ),
            InstructionDef::new(
                "database_instruction",
                vec![
                    FieldDef::new("table_name", S),
                    FieldDef::new("method", S),
                    FieldDef::new("target_tx", S),
                    FieldDef::new("content", S),
                ],
            ),
        ])
    }

    /// Parse a schema document from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::Schema(e.to_string()))
    }

    /// Find a definition by name.
    pub fn find(&self, name: &str) -> Option<&InstructionDef> {
        self.instructions.iter().find(|d| d.name == name)
    }

    /// Decode instruction data.
    ///
    /// Fails on an unknown discriminator or a body that does not match the
    /// definition. Trailing bytes after the last field are tolerated.
    pub fn decode(&self, data: &[u8]) -> Result<DecodedInstruction> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(CoreError::DecodingError(format!(
                "instruction data too short: {} bytes",
                data.len()
            )));
        }
        let (disc, body) = data.split_at(DISCRIMINATOR_LEN);

        let def = self
            .instructions
            .iter()
            .find(|d| d.discriminator() == disc)
            .ok_or_else(|| {
                CoreError::DecodingError(format!("unknown discriminator {}", hex::encode(disc)))
            })?;

        Ok(DecodedInstruction {
            name: def.name.clone(),
            fields: def.decode_fields(body)?,
        })
    }
}

/// Little-endian cursor over instruction bytes.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> std::result::Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| format!("need {n} bytes at offset {}, have {}", self.pos, self.buf.len()))?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> std::result::Result<[u8; N], String> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn len_prefixed(&mut self) -> std::result::Result<&'a [u8], String> {
        let len = u32::from_le_bytes(self.array()?) as usize;
        if len > MAX_FIELD_LEN {
            return Err(format!("length prefix {len} exceeds limit"));
        }
        self.take(len)
    }

    fn read(&mut self, ty: FieldType) -> std::result::Result<FieldValue, String> {
        Ok(match ty {
            FieldType::String => {
                let raw = self.len_prefixed()?;
                let s = std::str::from_utf8(raw).map_err(|e| e.to_string())?;
                FieldValue::String(s.to_owned())
            }
            FieldType::Bytes => FieldValue::Bytes(self.len_prefixed()?.to_vec()),
            FieldType::U8 => FieldValue::U8(self.array::<1>()?[0]),
            FieldType::U16 => FieldValue::U16(u16::from_le_bytes(self.array()?)),
            FieldType::U32 => FieldValue::U32(u32::from_le_bytes(self.array()?)),
            FieldType::U64 => FieldValue::U64(u64::from_le_bytes(self.array()?)),
            FieldType::I64 => FieldValue::I64(i64::from_le_bytes(self.array()?)),
            FieldType::Bool => match self.array::<1>()?[0] {
                0 => FieldValue::Bool(false),
                1 => FieldValue::Bool(true),
                b => return Err(format!("invalid bool byte {b}")),
            },
            FieldType::Pubkey => FieldValue::Pubkey(Address(self.array::<ADDRESS_LEN>()?)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_write_roundtrip() {
        let schema = InstructionSchema::standard();
        let def = schema.find("write_data").unwrap();
        let data = def.encode(&[
            FieldValue::String("users".into()),
            FieldValue::String("{name:'ann'}".into()),
        ]);

        let decoded = schema.decode(&data).unwrap();
        assert_eq!(decoded.name, "write_data");
        assert_eq!(decoded.get("table_name").and_then(|v| v.as_str()), Some("users"));
        assert_eq!(
            decoded.get_index(1).and_then(|v| v.as_str()),
            Some("{name:'ann'}")
        );
    }

    #[test]
    fn test_unknown_discriminator_fails() {
        let schema = InstructionSchema::standard();
        let err = schema.decode(&[0u8; 16]).unwrap_err();
        assert!(err.to_string().contains("unknown discriminator"));
    }

    #[test]
    fn test_truncated_body_fails() {
        let schema = InstructionSchema::standard();
        let mut data = discriminator("write_data").to_vec();
        data.extend_from_slice(&100u32.to_le_bytes());
        data.extend_from_slice(b"short");
        assert!(schema.decode(&data).is_err());
    }

    #[test]
    fn test_schema_from_json() {
        let schema = InstructionSchema::from_json(
            r#"{"instructions":[{"name":"writeData","fields":[
                {"name":"tableName","type":"string"},
                {"name":"chunk","type":"u32"},
                {"name":"flag","type":"bool"}
            ]}]}"#,
        )
        .unwrap();
        let def = schema.find("writeData").unwrap();
        let data = def.encode(&[
            FieldValue::String("t".into()),
            FieldValue::U32(7),
            FieldValue::Bool(true),
        ]);
        let decoded = schema.decode(&data).unwrap();
        assert_eq!(decoded.get("chunk"), Some(&FieldValue::U32(7)));
        assert_eq!(decoded.get("flag"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn test_discriminators_differ_by_name() {
        assert_ne!(discriminator("write_data"), discriminator("writeData"));
    }
}
