// src/keys/ec.rs
//! Elliptic-curve key implementation for the secp256k1 and P-256 curves.
//!
//! Wraps the RustCrypto ECDSA stack (`k256`, `p256`) behind the capability
//! surface of [`crate::keys::Key`]:
//! - Key generation using the system CSPRNG
//! - Compressed SEC1 public-key export / raw scalar private-key export
//! - SHA-256-prehashed ECDSA signing in canonical (low-S) form, serialized
//!   as the 64-byte compact (r ‖ s, IEEE-P1363) representation
//!
//! # Security Notes
//! - Secret scalars are never exposed through `Debug`
//! - Signing is deterministic (RFC 6979); identical input yields an
//!   identical signature

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rand::rngs::OsRng;

use crate::keys::{Curve, KeyError};
use crate::utils::crypto::hash_data;

/// An elliptic-curve keypair (secp256k1 or P-256), private or public-only.
#[derive(Clone)]
pub struct ECKey {
    keypair: EcKeyPair,
}

/// Per-curve key material. The secret half is absent for keys constructed
/// from a public encoding.
#[derive(Clone)]
enum EcKeyPair {
    K256 {
        secret: Option<k256::ecdsa::SigningKey>,
        public: k256::ecdsa::VerifyingKey,
    },
    P256 {
        secret: Option<p256::ecdsa::SigningKey>,
        public: p256::ecdsa::VerifyingKey,
    },
}

impl ECKey {
    /// Generates a new keypair on the given EC curve.
    ///
    /// Only reachable for [`Curve::K256`] and [`Curve::P256`]; the dispatch
    /// in [`crate::keys::Key::generate`] routes Ed25519 elsewhere.
    pub fn generate(curve: Curve) -> Self {
        let keypair = match curve {
            Curve::K256 => {
                let secret = k256::ecdsa::SigningKey::random(&mut OsRng);
                let public = secret.verifying_key().clone();
                EcKeyPair::K256 {
                    secret: Some(secret),
                    public,
                }
            }
            Curve::P256 => {
                let secret = p256::ecdsa::SigningKey::random(&mut OsRng);
                let public = secret.verifying_key().clone();
                EcKeyPair::P256 {
                    secret: Some(secret),
                    public,
                }
            }
            Curve::Ed25519 => unreachable!("ECKey::generate called with a non-EC curve"),
        };
        ECKey { keypair }
    }

    /// Constructs a public-only key from compressed or uncompressed SEC1
    /// point bytes.
    pub fn from_public_bytes(curve: Curve, bytes: &[u8]) -> Result<Self, KeyError> {
        let keypair = match curve {
            Curve::K256 => {
                let public = k256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                    .map_err(|err| KeyError::InvalidEncoding(format!("{curve} point: {err}")))?;
                EcKeyPair::K256 {
                    secret: None,
                    public,
                }
            }
            Curve::P256 => {
                let public = p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                    .map_err(|err| KeyError::InvalidEncoding(format!("{curve} point: {err}")))?;
                EcKeyPair::P256 {
                    secret: None,
                    public,
                }
            }
            Curve::Ed25519 => unreachable!("ECKey::from_public_bytes called with a non-EC curve"),
        };
        Ok(ECKey { keypair })
    }

    /// Constructs a private key from raw big-endian scalar bytes.
    pub fn from_private_bytes(curve: Curve, bytes: &[u8]) -> Result<Self, KeyError> {
        let keypair = match curve {
            Curve::K256 => {
                let secret = k256::ecdsa::SigningKey::from_slice(bytes)
                    .map_err(|err| KeyError::InvalidEncoding(format!("{curve} scalar: {err}")))?;
                let public = secret.verifying_key().clone();
                EcKeyPair::K256 {
                    secret: Some(secret),
                    public,
                }
            }
            Curve::P256 => {
                let secret = p256::ecdsa::SigningKey::from_slice(bytes)
                    .map_err(|err| KeyError::InvalidEncoding(format!("{curve} scalar: {err}")))?;
                let public = secret.verifying_key().clone();
                EcKeyPair::P256 {
                    secret: Some(secret),
                    public,
                }
            }
            Curve::Ed25519 => unreachable!("ECKey::from_private_bytes called with a non-EC curve"),
        };
        Ok(ECKey { keypair })
    }

    /// The curve this key lives on.
    pub fn curve(&self) -> Curve {
        match self.keypair {
            EcKeyPair::K256 { .. } => Curve::K256,
            EcKeyPair::P256 { .. } => Curve::P256,
        }
    }

    /// Whether this key carries private material.
    pub fn is_private(&self) -> bool {
        match &self.keypair {
            EcKeyPair::K256 { secret, .. } => secret.is_some(),
            EcKeyPair::P256 { secret, .. } => secret.is_some(),
        }
    }

    /// The public key as compressed SEC1 point bytes (33 bytes).
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match &self.keypair {
            EcKeyPair::K256 { public, .. } => public.to_encoded_point(true).as_bytes().to_vec(),
            EcKeyPair::P256 { public, .. } => public.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    /// The private key as raw big-endian scalar bytes (32 bytes).
    ///
    /// # Errors
    /// [`KeyError::NotPrivateKey`] if this key is public-only.
    pub fn private_key_bytes(&self) -> Result<Vec<u8>, KeyError> {
        match &self.keypair {
            EcKeyPair::K256 { secret, .. } => secret
                .as_ref()
                .map(|key| key.to_bytes().to_vec())
                .ok_or(KeyError::NotPrivateKey("encode_private")),
            EcKeyPair::P256 { secret, .. } => secret
                .as_ref()
                .map(|key| key.to_bytes().to_vec())
                .ok_or(KeyError::NotPrivateKey("encode_private")),
        }
    }

    /// Signs data with ECDSA over a SHA-256 prehash.
    ///
    /// The signature is normalized to canonical (low-S) form and serialized
    /// compact: r and s each left-padded to the 32-byte curve order width and
    /// concatenated (IEEE-P1363), 64 bytes total.
    ///
    /// # Errors
    /// [`KeyError::NotPrivateKey`] if this key is public-only.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, KeyError> {
        let digest = hash_data(data);
        match &self.keypair {
            EcKeyPair::K256 { secret, .. } => {
                let secret = secret.as_ref().ok_or(KeyError::NotPrivateKey("sign"))?;
                let signature: k256::ecdsa::Signature = secret
                    .sign_prehash(&digest)
                    .map_err(|err| KeyError::Signing(err.to_string()))?;
                let signature = signature.normalize_s().unwrap_or(signature);
                Ok(signature.to_bytes().to_vec())
            }
            EcKeyPair::P256 { secret, .. } => {
                let secret = secret.as_ref().ok_or(KeyError::NotPrivateKey("sign"))?;
                let signature: p256::ecdsa::Signature = secret
                    .sign_prehash(&digest)
                    .map_err(|err| KeyError::Signing(err.to_string()))?;
                let signature = signature.normalize_s().unwrap_or(signature);
                Ok(signature.to_bytes().to_vec())
            }
        }
    }

    /// Verifies a 64-byte compact ECDSA signature over SHA-256(data).
    ///
    /// Returns `Ok(false)` on a well-formed but non-matching signature;
    /// malformed signature bytes are an error.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
        let digest = hash_data(data);
        match &self.keypair {
            EcKeyPair::K256 { public, .. } => {
                let signature = k256::ecdsa::Signature::from_slice(signature)
                    .map_err(|err| KeyError::InvalidEncoding(format!("signature: {err}")))?;
                Ok(public.verify_prehash(&digest, &signature).is_ok())
            }
            EcKeyPair::P256 { public, .. } => {
                let signature = p256::ecdsa::Signature::from_slice(signature)
                    .map_err(|err| KeyError::InvalidEncoding(format!("signature: {err}")))?;
                Ok(public.verify_prehash(&digest, &signature).is_ok())
            }
        }
    }
}

impl std::fmt::Debug for ECKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ECKey")
            .field("curve", &self.curve())
            .field("is_private", &self.is_private())
            .finish()
    }
}
