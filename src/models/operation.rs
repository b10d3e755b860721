// src/models/operation.rs
//! PLC operation data model.
//!
//! An [`Operation`] is one entry in a DID's append-only log: the full
//! replacement state for the identifier (keys, aliases, services) plus a
//! `prev` link to the operation it supersedes. A genesis operation has no
//! `prev`; the DID's identifier is derived from its hash.
//!
//! Operations move through two states: a mutable unsigned draft, and an
//! immutable [`SignedOperation`] produced only by
//! [`crate::plc::signing::sign_operation`]. There is no way back from
//! signed to draft: the signature is bound to the exact canonical bytes of
//! the snapshot it wraps.

use crate::keys::Key;
use crate::plc::PlcError;

/// Operation type for a live log entry.
pub const TYPE_OPERATION: &str = "plc_operation";

/// Operation type that retires a DID permanently.
pub const TYPE_TOMBSTONE: &str = "plc_tombstone";

/// Required prefix for every verification method id.
pub const VERIFICATION_METHOD_PREFIX: &str = "fair_";

/// Verification method id under which the package-signing key is published.
/// Every genesis operation must carry this method.
pub const PACKAGE_SIGNING_METHOD: &str = "fair_pm";

/// A service endpoint advertised by a DID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Endpoint URL.
    pub endpoint: String,
    /// Service type tag, e.g. `FairPackageManagementRepo`.
    pub service_type: String,
}

/// An unsigned (draft) PLC operation.
///
/// `verification_methods` and `services` are insertion-ordered pair lists,
/// not maps: their order is part of the canonical encoding and must never be
/// re-sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// One of [`TYPE_OPERATION`] or [`TYPE_TOMBSTONE`].
    pub operation_type: String,

    /// Keys authorized to produce new operations for this DID.
    pub rotation_keys: Vec<Key>,

    /// Method id → attestation key. Ids must carry
    /// [`VERIFICATION_METHOD_PREFIX`].
    pub verification_methods: Vec<(String, Key)>,

    /// Alternative identifiers (aliases) for this DID.
    pub also_known_as: Vec<String>,

    /// Service id → endpoint descriptor.
    pub services: Vec<(String, Service)>,

    /// CID of the previous operation; `None` marks a genesis operation.
    pub prev: Option<String>,
}

impl Operation {
    /// Whether this operation starts a new log.
    pub fn is_genesis(&self) -> bool {
        self.prev.is_none()
    }

    /// Checks the operation's structural invariants.
    ///
    /// Must pass before signing; a draft that fails validation is never
    /// corrected silently.
    ///
    /// # Errors
    /// [`PlcError::InvalidOperation`] naming the first violated invariant.
    pub fn validate(&self) -> Result<(), PlcError> {
        if self.operation_type.is_empty() {
            return Err(PlcError::InvalidOperation(
                "operation type is empty".into(),
            ));
        }
        if self.operation_type != TYPE_OPERATION && self.operation_type != TYPE_TOMBSTONE {
            return Err(PlcError::InvalidOperation(format!(
                "invalid operation type: {}",
                self.operation_type
            )));
        }

        if self.operation_type == TYPE_OPERATION {
            if self.rotation_keys.is_empty() {
                return Err(PlcError::InvalidOperation("rotation keys are empty".into()));
            }
            if self.verification_methods.is_empty() {
                return Err(PlcError::InvalidOperation(
                    "verification methods are empty".into(),
                ));
            }
            for (id, _) in &self.verification_methods {
                if !id.starts_with(VERIFICATION_METHOD_PREFIX) {
                    return Err(PlcError::InvalidOperation(format!(
                        "invalid verification method id: {id}"
                    )));
                }
            }
        }

        if self.is_genesis() {
            // Re-checked here so a genesis operation stays safe even if the
            // per-type checks above change shape.
            if self.rotation_keys.is_empty() || self.verification_methods.is_empty() {
                return Err(PlcError::InvalidOperation(
                    "genesis operation is missing rotation keys or verification methods".into(),
                ));
            }
            if !self
                .verification_methods
                .iter()
                .any(|(id, _)| id == PACKAGE_SIGNING_METHOD)
            {
                return Err(PlcError::InvalidOperation(format!(
                    "genesis operation is missing the {PACKAGE_SIGNING_METHOD} verification method"
                )));
            }
        }

        Ok(())
    }

    /// Signs this draft with a rotation key, consuming it.
    ///
    /// Convenience forwarding to
    /// [`crate::plc::signing::sign_operation`].
    pub fn sign(self, rotation_key: &Key) -> Result<SignedOperation, PlcError> {
        crate::plc::signing::sign_operation(self, rotation_key)
    }
}

/// A signed, immutable PLC operation.
///
/// Owns a snapshot of the [`Operation`] it wraps; the signature is bound to
/// that snapshot's canonical bytes, so no mutation is exposed.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedOperation {
    operation: Operation,
    sig: String,
}

impl SignedOperation {
    /// Wraps an operation with its signature.
    ///
    /// Crate-internal: the only producers are the signing protocol and the
    /// directory client (reconstructing operations the directory already
    /// accepted).
    pub(crate) fn new(operation: Operation, sig: String) -> Self {
        SignedOperation { operation, sig }
    }

    /// The wrapped operation snapshot.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// The signature, base64url-encoded.
    pub fn sig(&self) -> &str {
        &self.sig
    }

    /// Checks the signature's presence plus every [`Operation::validate`]
    /// invariant.
    pub fn validate(&self) -> Result<(), PlcError> {
        if self.sig.is_empty() {
            return Err(PlcError::InvalidOperation("signature is empty".into()));
        }
        self.operation.validate()
    }
}
