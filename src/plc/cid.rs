// src/plc/cid.rs
//! Content identifiers for signed operations.
//!
//! CIDs link operations together (`prev`) and derive the genesis PLC
//! identifier. Per the PLC directory parameters, an operation's CID is:
//! - CIDv1 (`0x01`)
//! - dag-cbor codec (`0x71`)
//! - sha-256 multihash (`0x12`) with its 32-byte length
//! - the digest of the operation's canonical bytes
//!
//! all wrapped in a base32-lower multibase envelope. CIDs are always
//! recomputed from the signed operation; nothing caches them, so they can
//! never go stale relative to the bytes they identify.

use crate::models::operation::SignedOperation;
use crate::plc::encoder::encode_signed_operation;
use crate::utils::codec::{base32_encode, multibase_encode, MultibaseBase};
use crate::utils::crypto::hash_data;

/// Number of characters of the encoded genesis hash that become the PLC
/// identifier.
const PLC_ID_LENGTH: usize = 24;

/// Computes the CID for a signed operation.
pub fn cid_for_operation(operation: &SignedOperation) -> String {
    let encoded = encode_signed_operation(operation);
    let digest = hash_data(&encoded);

    let mut cid = Vec::with_capacity(4 + digest.len());
    cid.push(0x01); // CIDv1
    cid.push(0x71); // dag-cbor
    cid.push(0x12); // sha-256
    cid.push(digest.len() as u8);
    cid.extend_from_slice(&digest);

    multibase_encode(MultibaseBase::Base32Lower, &cid)
}

/// Derives the (unprefixed) PLC identifier from a genesis operation: the
/// first 24 characters of base32(sha256(canonical bytes)).
pub fn genesis_to_plc(operation: &SignedOperation) -> String {
    let encoded = encode_signed_operation(operation);
    let hash = hash_data(&encoded);
    let mut id = base32_encode(&hash);
    id.truncate(PLC_ID_LENGTH);
    id
}
