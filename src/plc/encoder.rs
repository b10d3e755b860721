// src/plc/encoder.rs
//! Canonical DAG-CBOR encoding of PLC operations.
//!
//! The directory service verifies signatures and computes CIDs over these
//! exact bytes, so the encoding is a wire contract, not an implementation
//! detail. Fields are emitted from an explicit ordered sequence:
//! `type, rotationKeys, verificationMethods, alsoKnownAs, services, prev`
//! and, for signed operations, a trailing `sig`. Nested maps keep the
//! insertion order they were constructed with. Nothing is ever re-sorted.
//!
//! The writer below covers the four CBOR shapes the format uses (text
//! strings, arrays, maps, null), always with definite lengths. A missing
//! `prev` is encoded as CBOR null, not omitted.

use crate::models::operation::{Operation, SignedOperation};

// CBOR major types, shifted into the high three bits of the initial byte.
const MAJOR_TEXT: u8 = 3 << 5;
const MAJOR_ARRAY: u8 = 4 << 5;
const MAJOR_MAP: u8 = 5 << 5;
const CBOR_NULL: u8 = 0xf6;

/// Writes a CBOR item header: major type plus definite length.
fn write_header(out: &mut Vec<u8>, major: u8, length: u64) {
    match length {
        0..=23 => out.push(major | length as u8),
        24..=0xff => {
            out.push(major | 24);
            out.push(length as u8);
        }
        0x100..=0xffff => {
            out.push(major | 25);
            out.extend_from_slice(&(length as u16).to_be_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(major | 26);
            out.extend_from_slice(&(length as u32).to_be_bytes());
        }
        _ => {
            out.push(major | 27);
            out.extend_from_slice(&length.to_be_bytes());
        }
    }
}

fn write_text(out: &mut Vec<u8>, text: &str) {
    write_header(out, MAJOR_TEXT, text.len() as u64);
    out.extend_from_slice(text.as_bytes());
}

fn write_text_array(out: &mut Vec<u8>, items: impl ExactSizeIterator<Item = String>) {
    write_header(out, MAJOR_ARRAY, items.len() as u64);
    for item in items {
        write_text(out, &item);
    }
}

/// Encodes an operation, optionally with its signature appended as the
/// final map entry.
fn encode(operation: &Operation, sig: Option<&str>) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);

    let entries = if sig.is_some() { 7 } else { 6 };
    write_header(&mut out, MAJOR_MAP, entries);

    write_text(&mut out, "type");
    write_text(&mut out, &operation.operation_type);

    write_text(&mut out, "rotationKeys");
    write_text_array(
        &mut out,
        operation.rotation_keys.iter().map(|key| key.encode_did_key()),
    );

    write_text(&mut out, "verificationMethods");
    write_header(&mut out, MAJOR_MAP, operation.verification_methods.len() as u64);
    for (id, key) in &operation.verification_methods {
        write_text(&mut out, id);
        write_text(&mut out, &key.encode_did_key());
    }

    write_text(&mut out, "alsoKnownAs");
    write_text_array(&mut out, operation.also_known_as.iter().cloned());

    write_text(&mut out, "services");
    write_header(&mut out, MAJOR_MAP, operation.services.len() as u64);
    for (id, service) in &operation.services {
        write_text(&mut out, id);
        write_header(&mut out, MAJOR_MAP, 2);
        write_text(&mut out, "endpoint");
        write_text(&mut out, &service.endpoint);
        write_text(&mut out, "type");
        write_text(&mut out, &service.service_type);
    }

    write_text(&mut out, "prev");
    match &operation.prev {
        Some(prev) => write_text(&mut out, prev),
        None => out.push(CBOR_NULL),
    }

    if let Some(sig) = sig {
        write_text(&mut out, "sig");
        write_text(&mut out, sig);
    }

    out
}

/// Canonically encodes an unsigned operation (the signing input).
pub fn encode_operation(operation: &Operation) -> Vec<u8> {
    encode(operation, None)
}

/// Canonically encodes a signed operation (the CID / genesis-hash input).
pub fn encode_signed_operation(operation: &SignedOperation) -> Vec<u8> {
    encode(operation.operation(), Some(operation.sig()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{Curve, Key};
    use crate::models::operation::{Service, SignedOperation, PACKAGE_SIGNING_METHOD, TYPE_OPERATION};

    fn sample_operation() -> Operation {
        Operation {
            operation_type: TYPE_OPERATION.to_string(),
            rotation_keys: vec![Key::generate(Curve::K256)],
            verification_methods: vec![(
                PACKAGE_SIGNING_METHOD.to_string(),
                Key::generate(Curve::K256),
            )],
            also_known_as: vec!["https://example.com/plugin".to_string()],
            services: vec![(
                "fairpm_repo".to_string(),
                Service {
                    endpoint: "https://example.com/wp-json/fair/packages".to_string(),
                    service_type: "FairPackageManagementRepo".to_string(),
                },
            )],
            prev: None,
        }
    }

    #[test]
    fn test_header_widths() {
        let mut out = Vec::new();
        write_header(&mut out, MAJOR_TEXT, 4);
        assert_eq!(out, [0x64]);

        out.clear();
        write_header(&mut out, MAJOR_TEXT, 24);
        assert_eq!(out, [0x78, 0x18]);

        out.clear();
        write_header(&mut out, MAJOR_TEXT, 0x1234);
        assert_eq!(out, [0x79, 0x12, 0x34]);
    }

    #[test]
    fn test_text_encoding() {
        let mut out = Vec::new();
        write_text(&mut out, "type");
        assert_eq!(out, [0x64, b't', b'y', b'p', b'e']);
    }

    #[test]
    fn test_unsigned_operation_is_six_entry_map() {
        let bytes = encode_operation(&sample_operation());
        assert_eq!(bytes[0], 0xa6, "map with six entries");
        // First key must be "type".
        assert_eq!(&bytes[1..6], [0x64, b't', b'y', b'p', b'e']);
        // Genesis prev encodes as null, immediately before end of buffer.
        assert_eq!(bytes[bytes.len() - 1], 0xf6);
    }

    #[test]
    fn test_signed_operation_appends_sig_entry() {
        let op = sample_operation();
        let signed = SignedOperation::new(op.clone(), "c2ln".to_string());
        let bytes = encode_signed_operation(&signed);
        assert_eq!(bytes[0], 0xa7, "map with seven entries");

        // The signed form is the unsigned form with the sig entry appended.
        let unsigned = encode_operation(&op);
        assert_eq!(&bytes[1..unsigned.len()], &unsigned[1..]);
        let tail = &bytes[unsigned.len()..];
        assert_eq!(tail, [0x63, b's', b'i', b'g', 0x64, b'c', b'2', b'l', b'n']);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let op = sample_operation();
        assert_eq!(encode_operation(&op), encode_operation(&op));
    }

    #[test]
    fn test_prev_link_is_inline_text() {
        let mut op = sample_operation();
        op.prev = Some("bafyreigq".to_string());
        let bytes = encode_operation(&op);
        assert!(!bytes.contains(&CBOR_NULL));
    }

    #[test]
    fn test_service_insertion_order_is_preserved() {
        let mut first = sample_operation();
        first.services.push((
            "fair_mirror".to_string(),
            Service {
                endpoint: "https://mirror.example.com".to_string(),
                service_type: "FairPackageManagementRepo".to_string(),
            },
        ));

        let mut second = first.clone();
        second.services.reverse();

        // Same semantic content, different construction order: the encoder
        // must not paper over the difference by sorting.
        assert_ne!(encode_operation(&first), encode_operation(&second));
    }

    #[test]
    fn test_key_bytes_flow_into_encoding() {
        let mut op = sample_operation();
        let original = encode_operation(&op);
        op.rotation_keys = vec![Key::generate(Curve::K256)];
        assert_ne!(encode_operation(&op), original);
    }
}
