// src/utils/codec.rs
//! Binary-to-text codecs used across the PLC stack.
//!
//! Provides the three encodings the `did:plc` wire formats are built from:
//! - base64url (RFC 4648 §5, unpadded) for operation signatures
//! - base32 (RFC 4648 §6, lowercase, unpadded) for CIDs and PLC identifiers
//! - multibase envelopes (base58btc `z`, base32-lower `b`) for key material
//!   and content identifiers

use thiserror::Error;

/// Lowercase RFC 4648 base32 alphabet, as used by CIDs and PLC identifiers.
const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Errors produced by the codec layer.
///
/// Decode failures are always surfaced to the caller; they typically indicate
/// corrupted key material or a malformed directory response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Input was not valid unpadded base64url.
    #[error("invalid base64url input: {0}")]
    Base64(String),

    /// Input contained a character outside the base32 alphabet.
    #[error("invalid base32 character {char:?} at offset {offset}")]
    Base32 { char: char, offset: usize },

    /// Input was not valid base58btc.
    #[error("invalid base58 input: {0}")]
    Base58(String),

    /// Input was empty or carried an unknown multibase prefix.
    #[error("invalid multibase string: {0}")]
    Multibase(String),
}

/// Multibase bases supported by this crate.
///
/// Only the two bases the `did:plc` method actually uses are modeled; the
/// prefix characters follow the multibase table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultibaseBase {
    /// Bitcoin-style base58, prefix `z`. Used for encoded keys.
    Base58Btc,
    /// Lowercase unpadded base32, prefix `b`. Used for CIDs.
    Base32Lower,
}

/// Encodes a binary string as unpadded base64url (RFC 4648 §5).
pub fn base64url_encode(data: &[u8]) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}

/// Decodes an unpadded base64url string (RFC 4648 §5).
pub fn base64url_decode(data: &str) -> Result<Vec<u8>, CodecError> {
    base64::decode_config(data, base64::URL_SAFE_NO_PAD)
        .map_err(|err| CodecError::Base64(err.to_string()))
}

/// Encodes a binary string as lowercase unpadded base32 (RFC 4648 §6).
///
/// Bits are consumed big-endian, five at a time; a final partial group is
/// left-aligned into the last character, matching the RFC (and the directory
/// service's expectations for CIDs and PLC identifiers).
pub fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8 + 4) / 5);
    let mut buffer: u32 = 0;
    let mut bits = 0usize;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        // bits < 5: left-align the remainder into one final character.
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

/// Decodes an unpadded base32 string (RFC 4648 §6).
///
/// Accepts both lowercase and uppercase input; trailing `=` padding is
/// tolerated and ignored. Trailing bits that do not fill a byte are dropped.
pub fn base32_decode(data: &str) -> Result<Vec<u8>, CodecError> {
    let trimmed = data.trim_end_matches('=');
    let mut out = Vec::with_capacity(trimmed.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0usize;

    for (offset, c) in trimmed.chars().enumerate() {
        let value = BASE32_ALPHABET
            .iter()
            .position(|&a| a as char == c.to_ascii_lowercase())
            .ok_or(CodecError::Base32 { char: c, offset })?;
        buffer = (buffer << 5) | value as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xff) as u8);
        }
    }
    Ok(out)
}

/// Encodes a binary string into a multibase string for the given base.
pub fn multibase_encode(base: MultibaseBase, data: &[u8]) -> String {
    match base {
        MultibaseBase::Base58Btc => format!("z{}", bs58::encode(data).into_string()),
        MultibaseBase::Base32Lower => format!("b{}", base32_encode(data)),
    }
}

/// Decodes a multibase string, dispatching on its prefix character.
///
/// Only the bases in [`MultibaseBase`] are recognized; anything else is a
/// [`CodecError::Multibase`].
pub fn multibase_decode(data: &str) -> Result<Vec<u8>, CodecError> {
    let mut chars = data.chars();
    let prefix = chars
        .next()
        .ok_or_else(|| CodecError::Multibase("empty input".to_string()))?;
    let payload = chars.as_str();

    match prefix {
        'z' => bs58::decode(payload)
            .into_vec()
            .map_err(|err| CodecError::Base58(err.to_string())),
        'b' => base32_decode(payload),
        other => Err(CodecError::Multibase(format!(
            "unknown base prefix {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64url_rfc4648_vectors() {
        let vectors: &[(&[u8], &str)] = &[
            (b"", ""),
            (b"f", "Zg"),
            (b"fo", "Zm8"),
            (b"foo", "Zm9v"),
            (b"foob", "Zm9vYg"),
            (b"fooba", "Zm9vYmE"),
            (b"foobar", "Zm9vYmFy"),
        ];
        for (input, expected) in vectors {
            assert_eq!(base64url_encode(input), *expected);
            assert_eq!(base64url_decode(expected).unwrap(), input.to_vec());
        }
    }

    #[test]
    fn test_base64url_uses_url_safe_alphabet() {
        // 0xfb 0xff encodes to characters from the URL-safe set, no padding.
        let encoded = base64url_encode(&[0xfb, 0xff]);
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('='));
        assert_eq!(base64url_decode(&encoded).unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_base32_rfc4648_vectors() {
        let vectors: &[(&[u8], &str)] = &[
            (b"", ""),
            (b"f", "my"),
            (b"fo", "mzxq"),
            (b"foo", "mzxw6"),
            (b"foob", "mzxw6yq"),
            (b"fooba", "mzxw6ytb"),
            (b"foobar", "mzxw6ytboi"),
        ];
        for (input, expected) in vectors {
            assert_eq!(base32_encode(input), *expected);
            assert_eq!(base32_decode(expected).unwrap(), input.to_vec());
        }
    }

    #[test]
    fn test_base32_decode_accepts_uppercase_and_padding() {
        assert_eq!(base32_decode("MZXW6YTBOI======").unwrap(), b"foobar");
    }

    #[test]
    fn test_base32_decode_rejects_invalid_character() {
        let err = base32_decode("mzx1").unwrap_err();
        assert_eq!(
            err,
            CodecError::Base32 {
                char: '1',
                offset: 3
            }
        );
    }

    #[test]
    fn test_multibase_base58btc_round_trip() {
        let encoded = multibase_encode(MultibaseBase::Base58Btc, b"hello");
        assert_eq!(encoded, "zCn8eVZg");
        assert_eq!(multibase_decode(&encoded).unwrap(), b"hello");
    }

    #[test]
    fn test_multibase_base32_round_trip() {
        let encoded = multibase_encode(MultibaseBase::Base32Lower, b"foobar");
        assert_eq!(encoded, "bmzxw6ytboi");
        assert_eq!(multibase_decode(&encoded).unwrap(), b"foobar");
    }

    #[test]
    fn test_multibase_decode_rejects_unknown_prefix() {
        assert!(matches!(
            multibase_decode("xabc"),
            Err(CodecError::Multibase(_))
        ));
        assert!(matches!(multibase_decode(""), Err(CodecError::Multibase(_))));
    }
}
