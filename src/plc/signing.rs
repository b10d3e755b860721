// src/plc/signing.rs
//! Signing protocol for PLC operations.
//!
//! Validation, canonical encoding, and signing are a single seam: a draft
//! operation is validated, serialized to its canonical bytes, signed with a
//! rotation key, and sealed as an immutable [`SignedOperation`] carrying
//! the base64url signature. Signature shape is curve-specific (see
//! [`crate::keys::Key::sign`]); transport encoding is always unpadded
//! base64url.

use crate::keys::Key;
use crate::models::operation::{Operation, SignedOperation};
use crate::plc::encoder::encode_operation;
use crate::plc::PlcError;
use crate::utils::codec::{base64url_decode, base64url_encode};

/// Validates and signs a draft operation with a rotation key.
///
/// # Errors
/// - [`PlcError::InvalidOperation`] if the draft fails validation
/// - [`PlcError::Key`] if the key is public-only or signing fails
pub fn sign_operation(operation: Operation, rotation_key: &Key) -> Result<SignedOperation, PlcError> {
    operation.validate()?;

    let encoded = encode_operation(&operation);
    let signature = rotation_key.sign(&encoded)?;
    let sig = base64url_encode(&signature);

    Ok(SignedOperation::new(operation, sig))
}

/// Verifies a signed operation's signature against its canonical bytes.
///
/// Returns `Ok(false)` when the signature is well-formed but was not
/// produced by `key` over these bytes.
pub fn verify_operation(operation: &SignedOperation, key: &Key) -> Result<bool, PlcError> {
    let encoded = encode_operation(operation.operation());
    let signature = base64url_decode(operation.sig())?;
    Ok(key.verify(&encoded, &signature)?)
}
