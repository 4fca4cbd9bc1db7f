//! Seed canonicalization for address derivation.
//!
//! A logical name becomes a fixed 32-byte seed. Names that are already a
//! 64-character hex string pass through as their raw bytes, so a caller can
//! compute a seed once and hand it back on later calls without re-hashing.

use sha2::{Digest, Sha256};

/// Length of a canonical seed in bytes.
pub const SEED_LEN: usize = 32;

/// Compute the 32-byte seed for a logical name.
///
/// The name is trimmed first. Composite names such as `"table/row/ext"` are
/// not special-cased: the whole string is one opaque input.
pub fn seed(name: &str) -> [u8; SEED_LEN] {
    let trimmed = name.trim();
    if let Some(raw) = decode_hex64(trimmed) {
        return raw;
    }
    Sha256::digest(trimmed.as_bytes()).into()
}

/// The seed of `name` as lower-case hex.
pub fn seed_hex(name: &str) -> String {
    hex::encode(seed(name))
}

/// Whether `s` is exactly 64 hex characters (either case).
pub fn is_hex64(s: &str) -> bool {
    s.len() == SEED_LEN * 2 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn decode_hex64(s: &str) -> Option<[u8; SEED_LEN]> {
    if !is_hex64(s) {
        return None;
    }
    let mut out = [0u8; SEED_LEN];
    hex::decode_to_slice(s, &mut out).ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_hashes_plain_names() {
        // sha256("abc")
        assert_eq!(
            seed_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_seed_trims_before_hashing() {
        assert_eq!(seed("  users\n"), seed("users"));
    }

    #[test]
    fn test_seed_hex_passthrough_is_case_insensitive() {
        let upper = "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD";
        assert_eq!(seed_hex(upper), upper.to_lowercase());
        assert_eq!(seed(upper), seed("abc"));
    }

    #[test]
    fn test_seed_is_idempotent_on_its_own_output() {
        let once = seed_hex("users/42/avatar");
        assert_eq!(seed_hex(&once), once);
    }

    #[test]
    fn test_near_hex_strings_are_hashed() {
        let sixty_three = "a".repeat(63);
        let with_g = format!("{}g", "a".repeat(63));
        assert_ne!(seed_hex(&sixty_three), sixty_three);
        assert_ne!(seed_hex(&with_g), with_g);
        assert!(!is_hex64(&with_g));
    }
}
