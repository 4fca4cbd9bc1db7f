//! Proptest strategies for names, payloads and upload orders.

use proptest::collection::vec;
use proptest::prelude::*;
use serde_json::Value;

use ledgerdb_core::Record;

/// Logical names as people type them: letters, digits, separators, and
/// the occasional stray whitespace.
pub fn logical_name() -> impl Strategy<Value = String> {
    "[ ]{0,2}[a-zA-Z0-9_/-]{1,24}[ ]{0,2}"
}

/// A 64-character hex string in mixed case.
pub fn hex64() -> impl Strategy<Value = String> {
    "[0-9a-fA-F]{64}"
}

/// Arbitrary bytes, up to `max_len` long.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    vec(any::<u8>(), 0..=max_len)
}

/// A flat record of scalar fields.
pub fn record() -> impl Strategy<Value = Record> {
    let value = prop_oneof![
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ];
    proptest::collection::btree_map("[a-z_]{1,8}", value, 0..6)
        .prop_map(|m| m.into_iter().collect())
}

/// An upload: a non-empty payload, a chunk size, and a deposit order that
/// visits every chunk exactly once.
#[derive(Debug, Clone)]
pub struct UploadPlan {
    pub payload: Vec<u8>,
    pub chunk_size: usize,
    pub order: Vec<u32>,
}

impl UploadPlan {
    pub fn chunk_count(&self) -> u32 {
        self.payload.len().div_ceil(self.chunk_size) as u32
    }
}

impl Arbitrary for UploadPlan {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (vec(any::<u8>(), 1..=512), 1usize..=64)
            .prop_flat_map(|(payload, chunk_size)| {
                let count = payload.len().div_ceil(chunk_size) as u32;
                let order: Vec<u32> = (0..count).collect();
                (Just(payload), Just(chunk_size), Just(order).prop_shuffle())
            })
            .prop_map(|(payload, chunk_size, order)| UploadPlan {
                payload,
                chunk_size,
                order,
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ledgerdb_core::{repair, seed, seed_hex, AddressDeriver, Address, ChunkDeposit, Namespace};
    use ledgerdb_scan::{ChunkSet, MAX_LISTED_MISSING};

    use crate::fixtures::split;

    fn chunk_set(plan: &UploadPlan, extra: &[(u32, &[u8])]) -> ChunkSet {
        let chunks = split(&plan.payload, plan.chunk_size);
        let mut set = ChunkSet::new();
        let deposits = plan
            .order
            .iter()
            .map(|&i| (i, chunks[i as usize]))
            .chain(extra.iter().copied());
        for (index, data) in deposits {
            set.insert(ChunkDeposit {
                session_id: [0; 16],
                index,
                method: 0,
                data: Bytes::copy_from_slice(data),
            });
        }
        set
    }

    proptest! {
        #[test]
        fn test_seed_deterministic(name in logical_name()) {
            prop_assert_eq!(seed(&name), seed(&name));
            prop_assert_eq!(seed(&name), seed(name.trim()));
        }

        #[test]
        fn test_hex64_passes_through(h in hex64()) {
            prop_assert_eq!(seed_hex(&h), h.to_lowercase());
        }

        #[test]
        fn test_seed_of_seed_is_stable(name in logical_name()) {
            let once = seed_hex(&name);
            prop_assert_eq!(seed_hex(&once), once);
        }

        #[test]
        fn test_roles_never_collide(owner in any::<[u8; 32]>(), name in logical_name()) {
            let deriver = AddressDeriver::new(Address::from_bytes([7; 32]));
            let owner = Address::from_bytes(owner);
            let derived: Vec<_> = Namespace::ALL
                .iter()
                .filter(|ns| **ns != Namespace::Root)
                .map(|ns| deriver.named(*ns, &owner, &name).unwrap())
                .chain(std::iter::once(deriver.root(&owner).unwrap()))
                .collect();
            for (i, a) in derived.iter().enumerate() {
                for b in &derived[i + 1..] {
                    prop_assert_ne!(a, b);
                }
            }
        }

        #[test]
        fn test_chunk_order_does_not_matter(plan: UploadPlan) {
            let set = chunk_set(&plan, &[]);
            let joined = set.concat();
            prop_assert_eq!(joined.as_ref(), plan.payload.as_slice());
            prop_assert!(set.missing(plan.chunk_count(), MAX_LISTED_MISSING).is_empty());
            prop_assert_eq!(set.missing_count(plan.chunk_count()), 0);
        }

        #[test]
        fn test_repeated_index_keeps_later(plan: UploadPlan, resent in payload(16)) {
            let set = chunk_set(&plan, &[(0, resent.as_slice())]);
            let chunks = split(&plan.payload, plan.chunk_size);
            let mut expected = resent.clone();
            for chunk in &chunks[1..] {
                expected.extend_from_slice(chunk);
            }
            prop_assert_eq!(set.len(), chunks.len());
            let joined = set.concat();
            prop_assert_eq!(joined.as_ref(), expected.as_slice());
        }

        #[test]
        fn test_repair_is_identity_on_json(rec in record()) {
            let text = serde_json::to_string(&rec).unwrap();
            prop_assert_eq!(repair(&text), Some(rec));
        }

        #[test]
        fn test_repair_is_idempotent(text in "[{}a-z:,'\" ]{0,40}") {
            if let Some(once) = repair(&text) {
                let again = repair(&serde_json::to_string(&once).unwrap());
                prop_assert_eq!(again, Some(once));
            }
        }
    }
}
