#![deny(unsafe_code)]

//! Hashing and operation identity.
//!
//! This crate encodes [`TypeRef`]s into canonical signature bytes and derives a
//! 64-bit [`OperationId`] from an operation's wire path and envelope shapes.
//! Two renderers that agree on the path and the envelope element types agree
//! on the id.

use std::fmt;

use accord_schema::{ContextKind, Primitive, TypeRef};
use facet::Facet;

/// Signature encoding tags for type serialization.
mod sig {
    // Primitives (0x01-0x0F)
    pub const BOOL: u8 = 0x01;
    pub const U8: u8 = 0x02;
    pub const U16: u8 = 0x03;
    pub const U32: u8 = 0x04;
    pub const U64: u8 = 0x05;
    pub const I8: u8 = 0x07;
    pub const I16: u8 = 0x08;
    pub const I32: u8 = 0x09;
    pub const I64: u8 = 0x0A;
    pub const F32: u8 = 0x0C;
    pub const F64: u8 = 0x0D;
    pub const CHAR: u8 = 0x0E;
    pub const STRING: u8 = 0x0F;
    pub const UNIT: u8 = 0x10;
    pub const BYTES: u8 = 0x11;

    // Containers (0x20-0x27)
    pub const LIST: u8 = 0x20;
    pub const OPTION: u8 = 0x21;
    pub const MAP: u8 = 0x23;
    pub const TUPLE: u8 = 0x25;
    pub const STREAM: u8 = 0x26;
    pub const ASYNC: u8 = 0x27;

    // Composite (0x30-0x33)
    pub const NAMED: u8 = 0x30;
    pub const CONTEXT: u8 = 0x31;
    pub const PARAM: u8 = 0x32;
    pub const BYTE_CHANNEL: u8 = 0x33;

    // Envelope pair separator
    pub const ENVELOPE: u8 = 0x40;
}

/// A unique operation identifier: hash of the wire path and envelope shapes.
#[derive(Facet, PartialEq, Eq, Hash, Debug, Clone, Copy, PartialOrd, Ord)]
#[repr(transparent)]
#[facet(transparent)]
pub struct OperationId(pub u64);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// Encode unsigned integers as varints.
pub fn encode_varint_u64(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn encode_string(s: &str, out: &mut Vec<u8>) {
    encode_varint_u64(s.len() as u64, out);
    out.extend_from_slice(s.as_bytes());
}

fn encode_list(items: &[TypeRef], out: &mut Vec<u8>) {
    encode_varint_u64(items.len() as u64, out);
    for item in items {
        encode_type(item, out);
    }
}

/// Encode a `TypeRef` into its canonical signature byte representation.
pub fn encode_type(ty: &TypeRef, out: &mut Vec<u8>) {
    match ty {
        TypeRef::Unit => out.push(sig::UNIT),
        TypeRef::Primitive(p) => encode_primitive(*p, out),
        TypeRef::Named { name, args } => {
            out.push(sig::NAMED);
            encode_string(&name.qualified(), out);
            encode_list(args, out);
        }
        TypeRef::List(inner) => {
            // Vec<u8> and Bytes are the same thing on the wire
            if **inner == TypeRef::Primitive(Primitive::U8) {
                out.push(sig::BYTES);
            } else {
                out.push(sig::LIST);
                encode_type(inner, out);
            }
        }
        TypeRef::Option(inner) => {
            out.push(sig::OPTION);
            encode_type(inner, out);
        }
        TypeRef::Map(k, v) => {
            out.push(sig::MAP);
            encode_type(k, out);
            encode_type(v, out);
        }
        TypeRef::Tuple(elements) => {
            out.push(sig::TUPLE);
            encode_list(elements, out);
        }
        TypeRef::Async(inner) => {
            out.push(sig::ASYNC);
            encode_type(inner, out);
        }
        TypeRef::Stream(inner) => {
            out.push(sig::STREAM);
            encode_type(inner, out);
        }
        TypeRef::Context(kind) => {
            out.push(sig::CONTEXT);
            out.push(context_tag(*kind));
        }
        TypeRef::ByteChannel(name) => {
            out.push(sig::BYTE_CHANNEL);
            encode_string(name, out);
        }
        TypeRef::Param(name) => {
            out.push(sig::PARAM);
            encode_string(name, out);
        }
    }
}

fn encode_primitive(p: Primitive, out: &mut Vec<u8>) {
    out.push(match p {
        Primitive::Bool => sig::BOOL,
        Primitive::I8 => sig::I8,
        Primitive::I16 => sig::I16,
        Primitive::I32 => sig::I32,
        Primitive::I64 => sig::I64,
        Primitive::U8 => sig::U8,
        Primitive::U16 => sig::U16,
        Primitive::U32 => sig::U32,
        Primitive::U64 => sig::U64,
        Primitive::F32 => sig::F32,
        Primitive::F64 => sig::F64,
        Primitive::Char => sig::CHAR,
        Primitive::String => sig::STRING,
        Primitive::Bytes => sig::BYTES,
    });
}

fn context_tag(kind: ContextKind) -> u8 {
    match kind {
        ContextKind::CancellationToken => 0,
        ContextKind::CallOptions => 1,
        ContextKind::CallContext => 2,
        ContextKind::ServerCallContext => 3,
    }
}

/// Encode an operation signature: request elements, then response elements.
pub fn encode_operation_signature(request: &[TypeRef], response: &[TypeRef], out: &mut Vec<u8>) {
    out.push(sig::ENVELOPE);
    encode_list(request, out);
    out.push(sig::ENVELOPE);
    encode_list(response, out);
}

/// The BLAKE3 hash of the canonical signature bytes.
pub fn signature_hash(request: &[TypeRef], response: &[TypeRef]) -> blake3::Hash {
    let mut bytes = Vec::new();
    encode_operation_signature(request, response, &mut bytes);
    blake3::hash(&bytes)
}

/// Compute the operation id: `blake3(lower(service)/lower(operation) ‖ sig_hash)[0..8]`.
///
/// Names are lowercased because operation uniqueness is case-insensitive.
pub fn operation_id(
    service_name: &str,
    operation_name: &str,
    request: &[TypeRef],
    response: &[TypeRef],
) -> OperationId {
    let sig = signature_hash(request, response);

    let mut input = Vec::new();
    input.extend_from_slice(service_name.to_lowercase().as_bytes());
    input.push(b'/');
    input.extend_from_slice(operation_name.to_lowercase().as_bytes());
    input.extend_from_slice(sig.as_bytes());

    let h = blake3::hash(&input);
    let mut first8 = [0u8; 8];
    first8.copy_from_slice(&h.as_bytes()[0..8]);
    OperationId(u64::from_le_bytes(first8))
}

/// A short stable digest of an element list, used for generated type names.
///
/// Built from the canonical encoding, so lists that print alike but differ
/// structurally get different digests.
pub fn short_digest(elements: &[TypeRef]) -> u32 {
    let mut bytes = Vec::new();
    encode_list(elements, &mut bytes);
    let h = blake3::hash(&bytes);
    let mut first4 = [0u8; 4];
    first4.copy_from_slice(&h.as_bytes()[0..4]);
    u32::from_le_bytes(first4)
}
