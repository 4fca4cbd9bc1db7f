//! Post-processing of a reassembled blob.
//!
//! Linear pipeline, no backtracking: base64 unwrapping first, then the
//! compression marker. File-type sniffing always runs on the output.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Leading byte marking a compressed payload.
pub const COMPRESSION_MARKER: u8 = 0x01;

/// Minimum buffer length for the compression marker to count.
pub const COMPRESSION_MIN_LEN: usize = 6;

/// Bytes inspected when deciding whether a buffer is base64 text.
pub const BASE64_SAMPLE_LEN: usize = 100;

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Result of post-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    /// The payload after every applicable step.
    pub decoded: Vec<u8>,
    pub base64_wrapped: bool,
    pub compressed: bool,
}

/// Whether `data` looks like base64 text.
///
/// The first byte must be an upper-case letter, `/` or `+`, and the first
/// [`BASE64_SAMPLE_LEN`] bytes, whitespace removed, must all be in the
/// base64 alphabet.
pub fn looks_like_base64(data: &[u8]) -> bool {
    let Some(&first) = data.first() else {
        return false;
    };
    if !(first.is_ascii_uppercase() || first == b'/' || first == b'+') {
        return false;
    }
    data.iter()
        .take(BASE64_SAMPLE_LEN)
        .filter(|b| !b.is_ascii_whitespace())
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
}

/// Decode `data` as base64 if it looks like it; `None` otherwise or when
/// decoding fails.
pub fn maybe_decode_base64(data: &[u8]) -> Option<Vec<u8>> {
    if !looks_like_base64(data) {
        return None;
    }
    let compact: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    LENIENT_BASE64.decode(compact).ok()
}

/// Drop the leading compression marker, if present.
///
/// Only the marker is removed; decompression itself is left to the caller.
pub fn strip_compression_marker(data: &[u8]) -> Option<&[u8]> {
    if data.len() >= COMPRESSION_MIN_LEN && data[0] == COMPRESSION_MARKER {
        Some(&data[1..])
    } else {
        None
    }
}

/// Run base64 detection, then marker stripping.
pub fn postprocess(raw: &[u8]) -> Processed {
    let (buffer, base64_wrapped) = match maybe_decode_base64(raw) {
        Some(decoded) => (decoded, true),
        None => (raw.to_vec(), false),
    };

    match strip_compression_marker(&buffer) {
        Some(rest) => Processed {
            decoded: rest.to_vec(),
            base64_wrapped,
            compressed: true,
        },
        None => Processed {
            decoded: buffer,
            base64_wrapped,
            compressed: false,
        },
    }
}

/// Standard base64 encoding, used for report fields.
pub fn encode_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_detection_requires_uppercase_start() {
        assert!(looks_like_base64(b"SGVsbG8="));
        assert!(looks_like_base64(b"+/8="));
        // Valid base64, but starts lower-case.
        assert!(!looks_like_base64(b"aGVsbG8="));
        assert!(!looks_like_base64(b"SGV*bG8="));
        assert!(!looks_like_base64(b""));
    }

    #[test]
    fn test_base64_ignores_whitespace() {
        assert_eq!(maybe_decode_base64(b"SGVs\nbG8="), Some(b"Hello".to_vec()));
        assert_eq!(maybe_decode_base64(b"SGVsbG8"), Some(b"Hello".to_vec()));
    }

    #[test]
    fn test_undecodable_base64_keeps_raw() {
        let processed = postprocess(b"ABC");
        assert_eq!(processed.decoded, b"ABC");
        assert!(!processed.base64_wrapped);
    }

    #[test]
    fn test_compression_marker() {
        assert_eq!(strip_compression_marker(&[1, 2, 3, 4, 5, 6]), Some(&[2, 3, 4, 5, 6][..]));
        assert_eq!(strip_compression_marker(&[1, 2, 3, 4, 5]), None);
        assert_eq!(strip_compression_marker(&[0, 2, 3, 4, 5, 6]), None);
    }

    #[test]
    fn test_base64_then_marker() {
        // base64 of [1, b'h', b'e', b'l', b'l', b'o']
        let encoded = encode_base64(&[1, b'h', b'e', b'l', b'l', b'o']);
        assert_eq!(encoded, "AWhlbGxv");
        let processed = postprocess(encoded.as_bytes());
        assert!(processed.base64_wrapped);
        assert!(processed.compressed);
        assert_eq!(processed.decoded, b"hello");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_postprocess_never_grows(raw in proptest::collection::vec(any::<u8>(), 0..256)) {
                let processed = postprocess(&raw);
                prop_assert!(processed.decoded.len() <= raw.len());
                if !processed.base64_wrapped && !processed.compressed {
                    prop_assert_eq!(processed.decoded, raw);
                }
            }
        }
    }
}
