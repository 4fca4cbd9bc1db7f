//! Deterministic address derivation.
//!
//! Every logical object (root, table, instruction log, target log) lives at a
//! program-derived address: a hash of a namespace tag, the owner key, optional
//! name seeds and a bump byte, chosen so the result is not a valid ed25519
//! point and therefore has no private key.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::seed::seed;

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 32;

/// Maximum length of a single seed component.
pub const MAX_SEED_LEN: usize = 32;

/// Domain marker appended to every derivation hash.
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// A 32-byte ledger address (account key).
///
/// Displayed and parsed as base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Encode as base58.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Parse from base58.
    pub fn from_base58(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| CoreError::InvalidKey(format!("{s}: {e}")))?;
        Self::try_from(bytes.as_slice())
    }

    /// Whether these bytes decompress to an ed25519 curve point.
    pub fn is_on_curve(&self) -> bool {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0).is_ok()
    }

    /// The all-zero address.
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_base58(s)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = CoreError;

    fn try_from(slice: &[u8]) -> Result<Self> {
        let arr: [u8; ADDRESS_LEN] = slice.try_into().map_err(|_| {
            CoreError::InvalidKey(format!("expected {ADDRESS_LEN} bytes, got {}", slice.len()))
        })?;
        Ok(Self(arr))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base58(&s).map_err(serde::de::Error::custom)
    }
}

/// Address roles. Each role hashes a distinct tag, so the same owner and
/// name never map to the same address across roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Root,
    Table,
    InstructionLog,
    TargetLog,
}

impl Namespace {
    /// All roles.
    pub const ALL: [Namespace; 4] = [
        Namespace::Root,
        Namespace::Table,
        Namespace::InstructionLog,
        Namespace::TargetLog,
    ];

    /// The seed tag for this role.
    pub const fn tag(self) -> &'static [u8] {
        match self {
            Namespace::Root => b"root",
            Namespace::Table => b"table",
            Namespace::InstructionLog => b"instruction",
            Namespace::TargetLog => b"target",
        }
    }
}

/// A derived address together with the bump byte that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAddress {
    pub address: Address,
    pub bump: u8,
}

/// Hash seeds into a candidate program address without searching for a bump.
///
/// Returns `None` if the result lies on the curve.
pub fn create_program_address(seeds: &[&[u8]], program_id: &Address) -> Result<Option<Address>> {
    let mut hasher = Sha256::new();
    for s in seeds {
        if s.len() > MAX_SEED_LEN {
            return Err(CoreError::SeedTooLong {
                len: s.len(),
                max: MAX_SEED_LEN,
            });
        }
        hasher.update(s);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);

    let candidate = Address(hasher.finalize().into());
    if candidate.is_on_curve() {
        Ok(None)
    } else {
        Ok(Some(candidate))
    }
}

/// Search bumps from 255 downward for the first off-curve address.
pub fn find_program_address(seeds: &[&[u8]], program_id: &Address) -> Result<DerivedAddress> {
    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = seeds.to_vec();
        with_bump.push(&bump_seed);
        if let Some(address) = create_program_address(&with_bump, program_id)? {
            return Ok(DerivedAddress { address, bump });
        }
    }
    Err(CoreError::NoViableBump)
}

/// Derive the address for `namespace` under `owner`.
///
/// `extra_seeds` are appended after the tag and owner key, in order.
pub fn derive(
    program_id: &Address,
    namespace: Namespace,
    owner: &Address,
    extra_seeds: &[&[u8]],
) -> Result<DerivedAddress> {
    let mut seeds: Vec<&[u8]> = Vec::with_capacity(2 + extra_seeds.len());
    seeds.push(namespace.tag());
    seeds.push(owner.as_bytes());
    seeds.extend_from_slice(extra_seeds);
    find_program_address(&seeds, program_id)
}

/// All role addresses for one owner and logical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBook {
    pub root: Address,
    pub table: Address,
    pub instruction_log: Address,
    pub target_log: Address,
}

/// Address derivation bound to one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressDeriver {
    program_id: Address,
}

impl AddressDeriver {
    pub fn new(program_id: Address) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> &Address {
        &self.program_id
    }

    /// Derive a named address for `namespace`.
    pub fn named(&self, namespace: Namespace, owner: &Address, name: &str) -> Result<Address> {
        let name_seed = seed(name);
        Ok(derive(&self.program_id, namespace, owner, &[&name_seed])?.address)
    }

    /// The owner's root address.
    pub fn root(&self, owner: &Address) -> Result<Address> {
        Ok(derive(&self.program_id, Namespace::Root, owner, &[])?.address)
    }

    pub fn table(&self, owner: &Address, name: &str) -> Result<Address> {
        self.named(Namespace::Table, owner, name)
    }

    pub fn instruction_log(&self, owner: &Address, name: &str) -> Result<Address> {
        self.named(Namespace::InstructionLog, owner, name)
    }

    pub fn target_log(&self, owner: &Address, name: &str) -> Result<Address> {
        self.named(Namespace::TargetLog, owner, name)
    }

    /// Table address for an extension table attached to one row.
    ///
    /// The composite name must match the writer's byte for byte.
    pub fn extension_table(
        &self,
        owner: &Address,
        table: &str,
        row_id: &str,
        extension: &str,
    ) -> Result<Address> {
        self.table(owner, &extension_table_name(table, row_id, extension))
    }

    /// Every role address for `name` in one pass.
    pub fn address_book(&self, owner: &Address, name: &str) -> Result<AddressBook> {
        Ok(AddressBook {
            root: self.root(owner)?,
            table: self.table(owner, name)?,
            instruction_log: self.instruction_log(owner, name)?,
            target_log: self.target_log(owner, name)?,
        })
    }
}

/// Compose the logical name of an extension table.
pub fn extension_table_name(table: &str, row_id: &str, extension: &str) -> String {
    format!("{table}/{row_id}/{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Address {
        Address::from_bytes([7u8; 32])
    }

    fn owner() -> Address {
        Address::from_bytes([0x11; 32])
    }

    #[test]
    fn test_base58_roundtrip() {
        let addr = Address::from_bytes([0x42; 32]);
        let text = addr.to_string();
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_system_program_is_all_ones() {
        let addr: Address = "11111111111111111111111111111111".parse().unwrap();
        assert_eq!(addr, Address::ZERO);
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(matches!(
            "not-base58-0OIl".parse::<Address>(),
            Err(CoreError::InvalidKey(_))
        ));
        // Valid base58, wrong length.
        assert!(matches!(
            "abc".parse::<Address>(),
            Err(CoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_derive_is_deterministic_and_off_curve() {
        let a = derive(&program(), Namespace::Table, &owner(), &[b"users"]).unwrap();
        let b = derive(&program(), Namespace::Table, &owner(), &[b"users"]).unwrap();
        assert_eq!(a, b);
        assert!(!a.address.is_on_curve());
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let deriver = AddressDeriver::new(program());
        let book = deriver.address_book(&owner(), "users").unwrap();
        let all = [book.root, book.table, book.instruction_log, book.target_log];
        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                assert_ne!(all[i], all[j]);
            }
        }
    }

    #[test]
    fn test_hex_seed_passthrough_gives_same_address() {
        let deriver = AddressDeriver::new(program());
        let hashed = crate::seed::seed_hex("users");
        assert_eq!(
            deriver.table(&owner(), "users").unwrap(),
            deriver.table(&owner(), &hashed).unwrap()
        );
    }

    #[test]
    fn test_extension_table_is_plain_composite_name() {
        let deriver = AddressDeriver::new(program());
        assert_eq!(
            deriver.extension_table(&owner(), "users", "42", "avatar").unwrap(),
            deriver.table(&owner(), "users/42/avatar").unwrap()
        );
        assert_ne!(
            deriver.extension_table(&owner(), "users", "42", "avatar").unwrap(),
            deriver.table(&owner(), "users/42/Avatar").unwrap()
        );
    }

    #[test]
    fn test_overlong_seed_rejected() {
        let long = [0u8; 33];
        assert!(matches!(
            derive(&program(), Namespace::Table, &owner(), &[&long]),
            Err(CoreError::SeedTooLong { len: 33, .. })
        ));
    }

    #[test]
    fn test_address_serializes_as_base58() {
        let addr = Address::from_bytes([0x42; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_base58()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
