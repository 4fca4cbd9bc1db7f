//! Upload-session descriptor accounts.
//!
//! Fixed layout, no version tag:
//!
//! | field        | offset | size |
//! |--------------|--------|------|
//! | owner        | 0      | 32   |
//! | session_id   | 32     | 16   |
//! | total_chunks | 48     | 4    |
//! | merkle_root  | 52     | 32   |
//! | status       | 84     | 1    |

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{CoreError, Result};
use crate::instruction::SESSION_ID_LEN;

/// Size of the fixed descriptor layout.
pub const DESCRIPTOR_LEN: usize = 85;

/// Lifecycle of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Finalized,
    Unknown(u8),
}

impl From<u8> for SessionStatus {
    fn from(b: u8) -> Self {
        match b {
            0 => SessionStatus::Active,
            1 => SessionStatus::Finalized,
            other => SessionStatus::Unknown(other),
        }
    }
}

impl SessionStatus {
    pub fn to_u8(self) -> u8 {
        match self {
            SessionStatus::Active => 0,
            SessionStatus::Finalized => 1,
            SessionStatus::Unknown(b) => b,
        }
    }
}

/// A parsed session descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDescriptor {
    pub owner: Address,
    #[serde(with = "hex_bytes")]
    pub session_id: [u8; SESSION_ID_LEN],
    pub total_chunks: u32,
    #[serde(with = "hex_bytes")]
    pub merkle_root: [u8; 32],
    pub status: SessionStatus,
}

impl SessionDescriptor {
    /// Parse account data. Bytes past the fixed layout are ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < DESCRIPTOR_LEN {
            return Err(CoreError::Malformed {
                expected: DESCRIPTOR_LEN,
                actual: data.len(),
            });
        }

        let mut owner = [0u8; 32];
        owner.copy_from_slice(&data[0..32]);
        let mut session_id = [0u8; SESSION_ID_LEN];
        session_id.copy_from_slice(&data[32..48]);
        let mut total = [0u8; 4];
        total.copy_from_slice(&data[48..52]);
        let mut merkle_root = [0u8; 32];
        merkle_root.copy_from_slice(&data[52..84]);

        Ok(Self {
            owner: Address(owner),
            session_id,
            total_chunks: u32::from_le_bytes(total),
            merkle_root,
            status: SessionStatus::from(data[84]),
        })
    }

    /// Encode to the fixed layout.
    pub fn to_bytes(&self) -> [u8; DESCRIPTOR_LEN] {
        let mut out = [0u8; DESCRIPTOR_LEN];
        out[0..32].copy_from_slice(self.owner.as_bytes());
        out[32..48].copy_from_slice(&self.session_id);
        out[48..52].copy_from_slice(&self.total_chunks.to_le_bytes());
        out[52..84].copy_from_slice(&self.merkle_root);
        out[84] = self.status.to_u8();
        out
    }

    pub fn is_finalized(&self) -> bool {
        self.status == SessionStatus::Finalized
    }
}

/// Serialize fixed byte arrays as lower-case hex.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut out = [0u8; N];
        hex::decode_to_slice(&s, &mut out).map_err(serde::de::Error::custom)?;
        Ok(out)
    }
}
