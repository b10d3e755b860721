// src/keys/eddsa.rs
//! Ed25519 key implementation.
//!
//! Wraps `ed25519-dalek` behind the capability surface of
//! [`crate::keys::Key`]. Unlike the EC curves, Ed25519 signs the raw message
//! rather than a SHA-256 prehash (the scheme hashes internally). That
//! asymmetry matches the atproto cryptography conventions the directory
//! service verifies against, and is deliberate.

use ed25519_dalek::{Signer, Verifier};
use rand::rngs::OsRng;

use crate::keys::KeyError;

/// An Ed25519 keypair, private or public-only.
#[derive(Clone)]
pub struct EdDSAKey {
    secret: Option<ed25519_dalek::SigningKey>,
    public: ed25519_dalek::VerifyingKey,
}

impl EdDSAKey {
    /// Generates a new keypair using the system CSPRNG.
    pub fn generate() -> Self {
        let secret = ed25519_dalek::SigningKey::generate(&mut OsRng);
        EdDSAKey {
            public: secret.verifying_key(),
            secret: Some(secret),
        }
    }

    /// Constructs a public-only key from 32 raw point bytes.
    pub fn from_public_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidEncoding("ed25519 public key must be 32 bytes".into()))?;
        let public = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|err| KeyError::InvalidEncoding(format!("ed25519 point: {err}")))?;
        Ok(EdDSAKey {
            secret: None,
            public,
        })
    }

    /// Constructs a private key from 32 raw seed bytes.
    pub fn from_private_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidEncoding("ed25519 secret key must be 32 bytes".into()))?;
        let secret = ed25519_dalek::SigningKey::from_bytes(&bytes);
        Ok(EdDSAKey {
            public: secret.verifying_key(),
            secret: Some(secret),
        })
    }

    /// Whether this key carries private material.
    pub fn is_private(&self) -> bool {
        self.secret.is_some()
    }

    /// The public key as raw point bytes (32 bytes).
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public.to_bytes().to_vec()
    }

    /// The private key as raw seed bytes (32 bytes).
    ///
    /// # Errors
    /// [`KeyError::NotPrivateKey`] if this key is public-only.
    pub fn private_key_bytes(&self) -> Result<Vec<u8>, KeyError> {
        self.secret
            .as_ref()
            .map(|key| key.to_bytes().to_vec())
            .ok_or(KeyError::NotPrivateKey("encode_private"))
    }

    /// Signs the raw message, producing a 64-byte Ed25519 signature.
    ///
    /// # Errors
    /// [`KeyError::NotPrivateKey`] if this key is public-only.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, KeyError> {
        let secret = self.secret.as_ref().ok_or(KeyError::NotPrivateKey("sign"))?;
        Ok(secret.sign(data).to_bytes().to_vec())
    }

    /// Verifies a 64-byte Ed25519 signature over the raw message.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
        let bytes: [u8; 64] = signature
            .try_into()
            .map_err(|_| KeyError::InvalidEncoding("ed25519 signature must be 64 bytes".into()))?;
        let signature = ed25519_dalek::Signature::from_bytes(&bytes);
        Ok(self.public.verify(data, &signature).is_ok())
    }
}

impl std::fmt::Debug for EdDSAKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdDSAKey")
            .field("is_private", &self.is_private())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_raw_message() {
        let key = EdDSAKey::generate();
        let signature = key.sign(b"attestation").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(key.verify(b"attestation", &signature).unwrap());
        assert!(!key.verify(b"tampered", &signature).unwrap());
    }

    #[test]
    fn test_public_only_key_cannot_sign() {
        let key = EdDSAKey::generate();
        let public = EdDSAKey::from_public_bytes(&key.public_key_bytes()).unwrap();
        assert!(!public.is_private());
        assert!(matches!(
            public.sign(b"data"),
            Err(KeyError::NotPrivateKey("sign"))
        ));
        assert!(matches!(
            public.private_key_bytes(),
            Err(KeyError::NotPrivateKey("encode_private"))
        ));
    }

    #[test]
    fn test_private_round_trip_preserves_signing_key() {
        let key = EdDSAKey::generate();
        let restored = EdDSAKey::from_private_bytes(&key.private_key_bytes().unwrap()).unwrap();
        assert_eq!(restored.public_key_bytes(), key.public_key_bytes());
        assert_eq!(restored.sign(b"m").unwrap(), key.sign(b"m").unwrap());
    }

    #[test]
    fn test_rejects_wrong_length_material() {
        assert!(EdDSAKey::from_public_bytes(&[0u8; 31]).is_err());
        assert!(EdDSAKey::from_private_bytes(&[0u8; 33]).is_err());
    }
}
