// src/keys/mod.rs
//! Polymorphic cryptographic keys for the PLC engine.
//!
//! A [`Key`] is a closed union over the three curves the `did:plc` method
//! supports: secp256k1 and P-256 (ECDSA, via [`ec::ECKey`]) and Ed25519
//! (EdDSA, via [`eddsa::EdDSAKey`]). Adding a curve means adding a variant
//! and its encode/sign branches; there is no open-ended registry.
//!
//! Keys travel as multibase strings:
//! `base58btc( multicodec-prefix(curve) || raw-key-bytes )`, with the fixed
//! two-byte prefix table from the multicodec registry. Public keys
//! additionally travel as `did:key:` strings.
//!
//! # Security Notes
//! - A key decoded from a public encoding reports `is_private() == false`
//!   and fails (never silently degrades) on `sign` / `encode_private`
//! - Private material never appears in `Debug` output

use std::collections::HashMap;

use thiserror::Error;

use crate::utils::codec::{multibase_encode, CodecError, MultibaseBase};

pub mod ec;
pub mod eddsa;

pub use ec::ECKey;
pub use eddsa::EdDSAKey;

/// Prefix of every `did:key:` string.
pub const DID_KEY_PREFIX: &str = "did:key:";

/// Errors produced by the key layer.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The two-byte multicodec prefix named a curve this engine does not
    /// support. Fatal; not retried.
    #[error("unsupported curve (multicodec prefix 0x{0:02x}{1:02x})")]
    UnsupportedCurve(u8, u8),

    /// A private-key capability was invoked on a public-only key. This is a
    /// programming error in the caller.
    #[error("cannot {0} with a public key")]
    NotPrivateKey(&'static str),

    /// Key or signature material failed to decode.
    #[error("invalid key encoding: {0}")]
    InvalidEncoding(String),

    /// The underlying signature scheme rejected the signing request.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A multibase/base64url envelope failed to decode.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// The closed set of curves supported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    /// secp256k1 (atproto "k256"). The default for newly generated keys.
    K256,
    /// NIST P-256.
    P256,
    /// Ed25519.
    Ed25519,
}

impl Curve {
    /// The fixed two-byte multicodec prefix for this curve.
    pub fn multicodec_prefix(self) -> [u8; 2] {
        match self {
            Curve::K256 => [0xe7, 0x01],
            Curve::P256 => [0x80, 0x24],
            Curve::Ed25519 => [0xed, 0x01],
        }
    }

    /// Resolves decoded multibase payload bytes to a curve by their leading
    /// two-byte multicodec prefix.
    ///
    /// # Errors
    /// [`KeyError::UnsupportedCurve`] for an unrecognized prefix;
    /// [`KeyError::InvalidEncoding`] if fewer than two bytes are present.
    pub fn from_prefix(decoded: &[u8]) -> Result<Self, KeyError> {
        match decoded {
            [0xe7, 0x01, ..] => Ok(Curve::K256),
            [0x80, 0x24, ..] => Ok(Curve::P256),
            [0xed, 0x01, ..] => Ok(Curve::Ed25519),
            [a, b, ..] => Err(KeyError::UnsupportedCurve(*a, *b)),
            _ => Err(KeyError::InvalidEncoding(
                "key material shorter than the multicodec prefix".into(),
            )),
        }
    }
}

impl std::fmt::Display for Curve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Curve::K256 => "secp256k1",
            Curve::P256 => "p256",
            Curve::Ed25519 => "ed25519",
        };
        f.write_str(name)
    }
}

/// A cryptographic key of any supported curve, private or public-only.
#[derive(Debug, Clone)]
pub enum Key {
    /// secp256k1 or P-256 (ECDSA).
    Ec(ECKey),
    /// Ed25519 (EdDSA).
    EdDsa(EdDSAKey),
}

impl Key {
    /// Generates a new private key on the given curve.
    pub fn generate(curve: Curve) -> Self {
        match curve {
            Curve::K256 | Curve::P256 => Key::Ec(ECKey::generate(curve)),
            Curve::Ed25519 => Key::EdDsa(EdDSAKey::generate()),
        }
    }

    /// Decodes a multibase public key string (starts with `z`).
    ///
    /// # Errors
    /// [`KeyError::UnsupportedCurve`] if the multicodec prefix is not in the
    /// supported set; [`KeyError::InvalidEncoding`] for malformed material.
    pub fn from_public(encoded: &str) -> Result<Self, KeyError> {
        let decoded = crate::utils::codec::multibase_decode(encoded)?;
        let curve = Curve::from_prefix(&decoded)?;
        let body = &decoded[2..];
        match curve {
            Curve::K256 | Curve::P256 => Ok(Key::Ec(ECKey::from_public_bytes(curve, body)?)),
            Curve::Ed25519 => Ok(Key::EdDsa(EdDSAKey::from_public_bytes(body)?)),
        }
    }

    /// Decodes a multibase private key string (starts with `z`).
    ///
    /// Failure modes as [`Key::from_public`].
    pub fn from_private(encoded: &str) -> Result<Self, KeyError> {
        let decoded = crate::utils::codec::multibase_decode(encoded)?;
        let curve = Curve::from_prefix(&decoded)?;
        let body = &decoded[2..];
        match curve {
            Curve::K256 | Curve::P256 => Ok(Key::Ec(ECKey::from_private_bytes(curve, body)?)),
            Curve::Ed25519 => Ok(Key::EdDsa(EdDSAKey::from_private_bytes(body)?)),
        }
    }

    /// Decodes a `did:key:` string to a public key.
    pub fn from_did_key(did: &str) -> Result<Self, KeyError> {
        let encoded = did
            .strip_prefix(DID_KEY_PREFIX)
            .ok_or_else(|| KeyError::InvalidEncoding(format!("not a did:key string: {did}")))?;
        if !encoded.starts_with('z') {
            return Err(KeyError::InvalidEncoding(format!(
                "did:key payload must be base58btc: {did}"
            )));
        }
        Key::from_public(encoded)
    }

    /// The curve this key lives on.
    pub fn curve(&self) -> Curve {
        match self {
            Key::Ec(key) => key.curve(),
            Key::EdDsa(_) => Curve::Ed25519,
        }
    }

    /// Whether this key carries private material.
    pub fn is_private(&self) -> bool {
        match self {
            Key::Ec(key) => key.is_private(),
            Key::EdDsa(key) => key.is_private(),
        }
    }

    /// Signs data with this key.
    ///
    /// EC curves hash the input with SHA-256 and sign the digest (canonical
    /// low-S ECDSA, 64-byte compact form); Ed25519 signs the raw message.
    /// The asymmetry follows the atproto signing conventions the directory
    /// verifies against and must not be unified.
    ///
    /// # Errors
    /// [`KeyError::NotPrivateKey`] if this key is public-only.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, KeyError> {
        match self {
            Key::Ec(key) => key.sign(data),
            Key::EdDsa(key) => key.sign(data),
        }
    }

    /// Verifies a signature produced by [`Key::sign`] over `data`.
    ///
    /// Returns `Ok(false)` for a well-formed but non-matching signature.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
        match self {
            Key::Ec(key) => key.verify(data, signature),
            Key::EdDsa(key) => key.verify(data, signature),
        }
    }

    /// The raw public key bytes (compressed SEC1 point for EC curves, raw
    /// point for Ed25519).
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match self {
            Key::Ec(key) => key.public_key_bytes(),
            Key::EdDsa(key) => key.public_key_bytes(),
        }
    }

    /// Encodes the public key as a multibase string (starts with `z`).
    pub fn encode_public(&self) -> String {
        let mut bytes = self.curve().multicodec_prefix().to_vec();
        bytes.extend(self.public_key_bytes());
        multibase_encode(MultibaseBase::Base58Btc, &bytes)
    }

    /// Encodes the private key as a multibase string (starts with `z`).
    ///
    /// # Errors
    /// [`KeyError::NotPrivateKey`] if this key is public-only.
    pub fn encode_private(&self) -> Result<String, KeyError> {
        let body = match self {
            Key::Ec(key) => key.private_key_bytes()?,
            Key::EdDsa(key) => key.private_key_bytes()?,
        };
        let mut bytes = self.curve().multicodec_prefix().to_vec();
        bytes.extend(body);
        Ok(multibase_encode(MultibaseBase::Base58Btc, &bytes))
    }

    /// Encodes the public key as a `did:key:` string.
    pub fn encode_did_key(&self) -> String {
        format!("{}{}", DID_KEY_PREFIX, self.encode_public())
    }
}

/// Keys compare by curve and public point; private material does not
/// participate, so a decoded public key equals its private original.
impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.curve() == other.curve() && self.public_key_bytes() == other.public_key_bytes()
    }
}

impl Eq for Key {}

/// Memoizes multibase string → [`Key`] decoding.
///
/// Encoded key strings are immutable content, so entries never need
/// invalidation. The cache is owned by the caller and passed by reference
/// wherever bulk decoding happens (directory response parsing, record
/// loading); dropping it is the only eviction.
#[derive(Debug, Default)]
pub struct KeyCache {
    public: HashMap<String, Key>,
    private: HashMap<String, Key>,
}

impl KeyCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a multibase public key string, memoized.
    pub fn decode_public(&mut self, encoded: &str) -> Result<Key, KeyError> {
        if let Some(key) = self.public.get(encoded) {
            return Ok(key.clone());
        }
        let key = Key::from_public(encoded)?;
        self.public.insert(encoded.to_string(), key.clone());
        Ok(key)
    }

    /// Decodes a multibase private key string, memoized.
    pub fn decode_private(&mut self, encoded: &str) -> Result<Key, KeyError> {
        if let Some(key) = self.private.get(encoded) {
            return Ok(key.clone());
        }
        let key = Key::from_private(encoded)?;
        self.private.insert(encoded.to_string(), key.clone());
        Ok(key)
    }

    /// Decodes a `did:key:` string, memoized on its multibase payload.
    pub fn decode_did_key(&mut self, did: &str) -> Result<Key, KeyError> {
        let encoded = did
            .strip_prefix(DID_KEY_PREFIX)
            .ok_or_else(|| KeyError::InvalidEncoding(format!("not a did:key string: {did}")))?;
        self.decode_public(encoded)
    }
}
