// src/models/did.rs
//! Persisted DID record model.

use serde::{Deserialize, Serialize};

/// The stored form of a DID: its identifier plus the encoded private key
/// material needed to keep operating it.
///
/// Key strings are multibase `encode_private()` forms. The `id` is assigned
/// exactly once, at genesis, and is never recomputed afterwards; loads
/// reconstruct a DID from this record verbatim.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DidRecord {
    /// The complete DID string identifier
    /// Example: "did:plc:ewvi7nxzyoun6zhxrhs64oiz"
    pub id: String,

    /// Encoded private rotation keys, in priority order
    pub rotation_keys: Vec<String>,

    /// Encoded private verification keys, in priority order
    pub verification_keys: Vec<String>,
}
