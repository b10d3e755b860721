// src/utils/crypto.rs
//! Cryptographic hash utilities.
//!
//! Uses SHA-256 for all digests: PLC operation signing, CID generation, and
//! genesis identifier derivation all hash the same canonical bytes.

use sha2::{Digest, Sha256};

/// Computes a SHA-256 hash of the input data.
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the digest.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        // SHA-256("abc"), FIPS 180-2 appendix B.1.
        let digest = hash_data(b"abc");
        assert_eq!(
            digest[..4],
            [0xba, 0x78, 0x16, 0xbf],
            "digest prefix mismatch"
        );
        assert_eq!(
            digest[28..],
            [0xf2, 0x00, 0x15, 0xad],
            "digest suffix mismatch"
        );
    }
}
