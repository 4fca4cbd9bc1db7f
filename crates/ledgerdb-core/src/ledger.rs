//! Ledger data types: signatures, accounts and transaction bodies.
//!
//! These mirror what a ledger RPC returns, already decoded from its text
//! encodings. The ledger is treated as an append-only log; nothing here is
//! ever mutated after it is fetched.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::address::Address;
use crate::error::{CoreError, Result};

/// Length of a transaction signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// A 64-byte transaction signature, displayed as base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; SIGNATURE_LEN]);

impl Signature {
    pub const fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    pub fn from_base58(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| CoreError::InvalidSignature(format!("{s}: {e}")))?;
        let arr: [u8; SIGNATURE_LEN] = bytes.as_slice().try_into().map_err(|_| {
            CoreError::InvalidSignature(format!(
                "expected {SIGNATURE_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// The zero signature (placeholder).
    pub const ZERO: Self = Self([0u8; SIGNATURE_LEN]);
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b58 = self.to_base58();
        write!(f, "Signature({}...)", &b58[..b58.len().min(16)])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl FromStr for Signature {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_base58(s)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base58(&s).map_err(serde::de::Error::custom)
    }
}

/// One entry of a signature listing for an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub signature: Signature,
    pub slot: u64,
    pub block_time: Option<i64>,
    /// Whether the transaction failed on-chain.
    pub failed: bool,
}

/// Raw account state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub data: Vec<u8>,
    pub owner: Address,
    pub lamports: u64,
}

/// A compiled instruction: program and accounts are indices into the
/// transaction's account-key list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

/// Instructions invoked from within top-level instruction `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerInstructions {
    pub index: u8,
    pub instructions: Vec<CompiledInstruction>,
}

/// A fetched transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub signature: Signature,
    pub slot: u64,
    pub block_time: Option<i64>,
    /// Static keys followed by any loaded (lookup-table) keys.
    pub account_keys: Vec<Address>,
    pub instructions: Vec<CompiledInstruction>,
    pub inner_instructions: Vec<InnerInstructions>,
}

/// Where an instruction sits inside its transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstructionLocation {
    /// Index of the top-level instruction.
    pub outer: usize,
    /// Index within that instruction's inner list, if nested.
    pub inner: Option<usize>,
}

/// A borrowed view of one instruction with its program resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionView<'a> {
    pub program_id: Address,
    pub data: &'a [u8],
    pub location: InstructionLocation,
}

impl TransactionBody {
    fn resolve(&self, ix: &CompiledInstruction) -> Option<Address> {
        self.account_keys.get(ix.program_id_index as usize).copied()
    }

    /// Every instruction, top-level first, then inner instructions in the
    /// order the ledger reports them. Instructions whose program index does
    /// not resolve are skipped.
    pub fn all_instructions(&self) -> Vec<InstructionView<'_>> {
        let mut out = Vec::with_capacity(self.instructions.len());

        for (outer, ix) in self.instructions.iter().enumerate() {
            if let Some(program_id) = self.resolve(ix) {
                out.push(InstructionView {
                    program_id,
                    data: &ix.data,
                    location: InstructionLocation { outer, inner: None },
                });
            }
        }

        for group in &self.inner_instructions {
            for (inner, ix) in group.instructions.iter().enumerate() {
                if let Some(program_id) = self.resolve(ix) {
                    out.push(InstructionView {
                        program_id,
                        data: &ix.data,
                        location: InstructionLocation {
                            outer: group.index as usize,
                            inner: Some(inner),
                        },
                    });
                }
            }
        }

        out
    }

    /// Instructions executed by `program`.
    pub fn program_instructions(&self, program: &Address) -> Vec<InstructionView<'_>> {
        self.all_instructions()
            .into_iter()
            .filter(|view| &view.program_id == program)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> TransactionBody {
        let program = Address::from_bytes([9; 32]);
        let other = Address::from_bytes([8; 32]);
        TransactionBody {
            signature: Signature::from_bytes([1; 64]),
            slot: 10,
            block_time: Some(1_700_000_000),
            account_keys: vec![Address::from_bytes([1; 32]), program, other],
            instructions: vec![
                CompiledInstruction {
                    program_id_index: 1,
                    accounts: vec![0],
                    data: vec![1],
                },
                CompiledInstruction {
                    program_id_index: 2,
                    accounts: vec![],
                    data: vec![2],
                },
                CompiledInstruction {
                    program_id_index: 40,
                    accounts: vec![],
                    data: vec![3],
                },
            ],
            inner_instructions: vec![InnerInstructions {
                index: 1,
                instructions: vec![CompiledInstruction {
                    program_id_index: 1,
                    accounts: vec![],
                    data: vec![4],
                }],
            }],
        }
    }

    #[test]
    fn test_program_instructions_include_inner() {
        let body = body();
        let views = body.program_instructions(&Address::from_bytes([9; 32]));
        let data: Vec<u8> = views.iter().map(|v| v.data[0]).collect();
        assert_eq!(data, vec![1, 4]);
        assert_eq!(
            views[1].location,
            InstructionLocation {
                outer: 1,
                inner: Some(0)
            }
        );
    }

    #[test]
    fn test_unresolvable_program_index_is_skipped() {
        let body = body();
        assert_eq!(body.all_instructions().len(), 3);
    }

    #[test]
    fn test_signature_base58_roundtrip() {
        let sig = Signature::from_bytes([0xab; 64]);
        let parsed: Signature = sig.to_string().parse().unwrap();
        assert_eq!(parsed, sig);
        assert!("short".parse::<Signature>().is_err());
    }
}
