// src/plc/mod.rs
//! The `did:plc` domain core: canonical encoding, CIDs, signing, and the
//! DID lifecycle controller.
//!
//! Everything in this module ultimately serves one contract: an operation's
//! canonical bytes must reproduce, bit for bit, what the public PLC
//! directory hashes and verifies. Signatures are computed over those bytes,
//! CIDs are hashes of those bytes, and the DID identifier itself is derived
//! from the genesis operation's hash. A single divergent byte breaks the
//! whole chain.

use thiserror::Error;

use crate::keys::KeyError;
use crate::storage::record_store::StoreError;
use crate::utils::codec::CodecError;

pub mod cid;
pub mod did;
pub mod encoder;
pub mod signing;

/// Errors produced by the PLC domain core.
#[derive(Debug, Error)]
pub enum PlcError {
    /// An operation failed validation. Fatal for that operation; it must not
    /// be signed or submitted.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The directory service could not be reached or answered with an
    /// unexpected status. Retryable by the caller; the engine itself never
    /// retries.
    #[error("directory error: {0}")]
    Directory(String),

    /// A key-set mutation would leave the DID in an unusable state, e.g.
    /// revoking the last verification key. Recoverable; the caller must
    /// choose a different action.
    #[error("key constraint violation: {0}")]
    KeyConstraintViolation(String),

    /// Key material failed to decode, sign, or misuse of a public-only key.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// A codec envelope failed to decode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The persistence layer failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}
