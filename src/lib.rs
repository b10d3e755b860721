// src/lib.rs
//! # fair-plc
//!
//! A `did:plc` engine for FAIR package hosts: cryptographically-verifiable
//! decentralized identifiers backed by an append-only, signed operation log
//! on a public PLC directory.
//!
//! The crate covers the full identifier lifecycle:
//! - polymorphic keys over secp256k1, P-256, and Ed25519 ([`keys`])
//! - canonical DAG-CBOR operation encoding, content identifiers, and
//!   signing ([`plc`])
//! - the lifecycle controller driving genesis creation, diff-based updates,
//!   and key management ([`plc::did`])
//! - the directory HTTP client ([`services`]) and DID record persistence
//!   ([`storage`])
//!
//! The hosting application supplies storage (via
//! [`storage::record_store::RecordStore`]) and configuration; everything
//! else lives here.

pub mod keys; // Cryptographic key abstraction
pub mod models; // Data structures
pub mod plc; // did:plc domain core
pub mod services; // Directory HTTP client
pub mod storage; // DID record persistence
pub mod utils; // Codecs and hashing
