//! Golden vectors for seed hashing and instruction discriminators.
//!
//! Any reader of the same ledger must derive the same seeds and recognise the
//! same discriminators. These values are fixed by data already written; a
//! change here means old tables stop resolving.

use ledgerdb_core::schema::discriminator;
use ledgerdb_core::seed_hex;

/// A logical name and the seed it must hash to.
#[derive(Debug, Clone, Copy)]
pub struct SeedVector {
    pub name: &'static str,
    pub input: &'static str,
    pub expected_seed: &'static str,
}

/// An instruction name and its 8-byte discriminator.
#[derive(Debug, Clone, Copy)]
pub struct DiscriminatorVector {
    pub instruction: &'static str,
    pub expected: &'static str,
}

pub fn seed_vectors() -> Vec<SeedVector> {
    vec![
        SeedVector {
            name: "empty",
            input: "",
            expected_seed: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        },
        SeedVector {
            name: "plain",
            input: "abc",
            expected_seed: "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        },
        SeedVector {
            name: "padded",
            input: "  users \n",
            expected_seed: "7dfb4cf67742cb0660305e56ef816c53fcec892cae7f6ee39b75f34e659d672c",
        },
        SeedVector {
            name: "composite",
            input: "users/42/avatar",
            expected_seed: "c590bfe202e7c0a8a55e368c12e45c58a2bfdf7a7160b3469d231b7de0e0d1b1",
        },
        SeedVector {
            name: "hex_passthrough",
            input: "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD",
            expected_seed: "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        },
    ]
}

pub fn discriminator_vectors() -> Vec<DiscriminatorVector> {
    vec![
        DiscriminatorVector {
            instruction: "write_data",
            expected: "d398c38353b3f84d",
        },
        DiscriminatorVector {
            instruction: "database_instruction",
            expected: "72eec0ab54697c0c",
        },
    ]
}

/// Check every vector, returning `(name, matches, actual)`.
pub fn verify_all() -> Vec<(String, bool, String)> {
    let seeds = seed_vectors().into_iter().map(|v| {
        let actual = seed_hex(v.input);
        (v.name.to_string(), actual == v.expected_seed, actual)
    });
    let discs = discriminator_vectors().into_iter().map(|v| {
        let actual = hex::encode(discriminator(v.instruction));
        (v.instruction.to_string(), actual == v.expected, actual)
    });
    seeds.chain(discs).collect()
}
