//! Value payload codecs
//!
//! Encodes and decodes the contents octets of the universal types carried
//! by [`Value`]. All encoders choose the shortest valid representation.
//!
//! # Real encoding (X.690 §8.5)
//!
//! - `0.0` → no contents octets
//! - `+∞` / `−∞` / NaN / `−0.0` → special values `0x40` / `0x41` / `0x42` / `0x43`
//! - finite values → binary form, base 2, scale 0, odd mantissa, minimal
//!   two's-complement exponent

use crate::error::{EmberError, EmberResult};
use crate::sink::OctetSink;
use crate::types::{Tag, TagClass};
use ember_core::{ObjectIdentifier, Value, ValueType};

const REAL_PLUS_INFINITY: u8 = 0x40;
const REAL_MINUS_INFINITY: u8 = 0x41;
const REAL_NOT_A_NUMBER: u8 = 0x42;
const REAL_MINUS_ZERO: u8 = 0x43;

// ---------------------------------------------------------------------------
// base-128 sub-identifiers (shared by tags, OIDs and RELATIVE-OIDs)

/// Number of octets for a base-128 encoded sub-identifier
pub fn base128_length(value: u32) -> usize {
    let bits = 32 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Encode a sub-identifier, most significant group first
pub fn encode_base128<S: OctetSink + ?Sized>(value: u32, sink: &mut S) -> EmberResult<()> {
    let length = base128_length(value);
    for i in (0..length).rev() {
        let group = ((value >> (i * 7)) & 0x7F) as u8;
        if i > 0 {
            sink.write_byte(group | 0x80)?;
        } else {
            sink.write_byte(group)?;
        }
    }
    Ok(())
}

/// Decode a sub-identifier starting at `*pos`, advancing `*pos`
pub fn decode_base128(data: &[u8], pos: &mut usize) -> EmberResult<u32> {
    let mut value = 0u32;
    loop {
        let byte = *data.get(*pos).ok_or_else(|| {
            EmberError::Asn1Decoding("Truncated base-128 sub-identifier".to_string())
        })?;
        *pos += 1;

        if value > (u32::MAX >> 7) {
            return Err(EmberError::Asn1Decoding(
                "Base-128 sub-identifier exceeds 32 bits".to_string(),
            ));
        }
        value = (value << 7) | (byte & 0x7F) as u32;

        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
}

// ---------------------------------------------------------------------------
// INTEGER

/// Minimal two's-complement length of an integer
pub fn integer_length(value: i64) -> usize {
    let mut length = 1;
    while length < 8 {
        let bits = length * 8 - 1;
        let min = -(1i64 << bits);
        let max = (1i64 << bits) - 1;
        if value >= min && value <= max {
            break;
        }
        length += 1;
    }
    length
}

fn encode_integer<S: OctetSink + ?Sized>(value: i64, sink: &mut S) -> EmberResult<()> {
    let length = integer_length(value);
    for i in (0..length).rev() {
        sink.write_byte(((value >> (i * 8)) & 0xFF) as u8)?;
    }
    Ok(())
}

/// Decode big-endian two's complement contents to `i64`
pub fn decode_integer_payload(bytes: &[u8]) -> EmberResult<i64> {
    if bytes.is_empty() {
        return Err(EmberError::Asn1Decoding("Empty integer encoding".to_string()));
    }
    if bytes.len() > 8 {
        return Err(EmberError::Asn1Decoding(format!(
            "Integer too large: {} bytes (max 8)",
            bytes.len()
        )));
    }

    let is_negative = (bytes[0] & 0x80) != 0;
    let mut value: i64 = if is_negative { -1 } else { 0 };
    for &byte in bytes {
        value = (value << 8) | byte as i64;
    }
    Ok(value)
}

fn unsigned_length(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

// ---------------------------------------------------------------------------
// REAL

/// Encoded REAL contents; at most 1 + 2 + 7 octets for an f64
#[derive(Debug, Clone, Copy)]
struct RealEncoding {
    bytes: [u8; 12],
    len: usize,
}

impl RealEncoding {
    fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

fn real_encoding(value: f64) -> RealEncoding {
    let mut out = RealEncoding {
        bytes: [0u8; 12],
        len: 0,
    };

    if value == 0.0 {
        if value.is_sign_negative() {
            out.bytes[0] = REAL_MINUS_ZERO;
            out.len = 1;
        }
        return out;
    }
    if value.is_nan() {
        out.bytes[0] = REAL_NOT_A_NUMBER;
        out.len = 1;
        return out;
    }
    if value.is_infinite() {
        out.bytes[0] = if value > 0.0 {
            REAL_PLUS_INFINITY
        } else {
            REAL_MINUS_INFINITY
        };
        out.len = 1;
        return out;
    }

    let bits = value.to_bits();
    let negative = (bits >> 63) != 0;
    let exponent_bits = ((bits >> 52) & 0x7FF) as i64;
    let fraction = bits & ((1u64 << 52) - 1);

    let (mut mantissa, mut exponent) = if exponent_bits == 0 {
        (fraction, -1074i64)
    } else {
        (fraction | (1u64 << 52), exponent_bits - 1075)
    };

    let shift = mantissa.trailing_zeros();
    mantissa >>= shift;
    exponent += shift as i64;

    let exponent_len = integer_length(exponent);
    let mantissa_len = unsigned_length(mantissa);

    let mut first = 0x80 | (exponent_len as u8 - 1);
    if negative {
        first |= 0x40;
    }
    out.bytes[0] = first;
    let mut pos = 1;
    for i in (0..exponent_len).rev() {
        out.bytes[pos] = ((exponent >> (i * 8)) & 0xFF) as u8;
        pos += 1;
    }
    for i in (0..mantissa_len).rev() {
        out.bytes[pos] = ((mantissa >> (i * 8)) & 0xFF) as u8;
        pos += 1;
    }
    out.len = pos;
    out
}

/// Multiply by a power of two without intermediate overflow or underflow
fn scale_by_power_of_two(mut value: f64, mut exponent: i64) -> f64 {
    const STEP: i64 = 1000;
    let pow2 = |e: i64| f64::from_bits(((e + 1023) as u64) << 52);

    while exponent > STEP {
        value *= pow2(STEP);
        exponent -= STEP;
        if value.is_infinite() {
            return value;
        }
    }
    while exponent < -STEP {
        value *= pow2(-STEP);
        exponent += STEP;
        if value == 0.0 {
            return value;
        }
    }
    value * pow2(exponent)
}

/// Decode REAL contents octets
pub fn decode_real_payload(bytes: &[u8]) -> EmberResult<f64> {
    let Some(&first) = bytes.first() else {
        return Ok(0.0);
    };

    if first & 0x80 != 0 {
        let negative = first & 0x40 != 0;
        let base_bits: i64 = match (first >> 4) & 0x03 {
            0 => 1,
            1 => 3,
            2 => 4,
            _ => {
                return Err(EmberError::Asn1Decoding(
                    "Reserved REAL base".to_string(),
                ))
            }
        };
        let scale = ((first >> 2) & 0x03) as i64;

        let mut pos = 1;
        let exponent_len = match first & 0x03 {
            0 => 1,
            1 => 2,
            2 => 3,
            _ => {
                let len = *bytes.get(1).ok_or_else(|| {
                    EmberError::Asn1Decoding("Truncated REAL exponent length".to_string())
                })? as usize;
                pos = 2;
                len
            }
        };

        if exponent_len == 0 || exponent_len > 8 || bytes.len() < pos + exponent_len {
            return Err(EmberError::Asn1Decoding(format!(
                "Invalid REAL exponent of {} octets",
                exponent_len
            )));
        }
        let exponent = decode_integer_payload(&bytes[pos..pos + exponent_len])?;
        pos += exponent_len;

        let mantissa_bytes = &bytes[pos..];
        if mantissa_bytes.len() > 8 {
            return Err(EmberError::Asn1Decoding(format!(
                "REAL mantissa too large: {} bytes (max 8)",
                mantissa_bytes.len()
            )));
        }
        let mantissa = mantissa_bytes
            .iter()
            .fold(0u64, |acc, &byte| (acc << 8) | byte as u64);

        let binary_exponent = exponent
            .checked_mul(base_bits)
            .and_then(|e| e.checked_add(scale))
            .ok_or_else(|| EmberError::Asn1Decoding("REAL exponent overflow".to_string()))?;
        let magnitude = scale_by_power_of_two(mantissa as f64, binary_exponent);
        return Ok(if negative { -magnitude } else { magnitude });
    }

    if first & 0x40 != 0 {
        return match first {
            REAL_PLUS_INFINITY => Ok(f64::INFINITY),
            REAL_MINUS_INFINITY => Ok(f64::NEG_INFINITY),
            REAL_NOT_A_NUMBER => Ok(f64::NAN),
            REAL_MINUS_ZERO => Ok(-0.0),
            other => Err(EmberError::Asn1Decoding(format!(
                "Unknown REAL special value 0x{:02X}",
                other
            ))),
        };
    }

    // ISO 6093 decimal form
    let text = std::str::from_utf8(&bytes[1..])
        .map_err(|_| EmberError::Asn1Decoding("Non-ASCII decimal REAL".to_string()))?;
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| EmberError::Asn1Decoding(format!("Invalid decimal REAL {:?}", text)))
}

// ---------------------------------------------------------------------------
// OBJECT IDENTIFIER / RELATIVE-OID

fn oid_first_subidentifier(oid: &ObjectIdentifier) -> Option<u32> {
    let arcs = oid.arcs();
    if arcs.len() < 2 || arcs[0] > 2 || (arcs[0] < 2 && arcs[1] >= 40) {
        return None;
    }
    arcs[0].checked_mul(40).and_then(|x| x.checked_add(arcs[1]))
}

fn oid_length(oid: &ObjectIdentifier) -> usize {
    match oid_first_subidentifier(oid) {
        Some(first) => {
            base128_length(first) + oid.arcs()[2..].iter().map(|&a| base128_length(a)).sum::<usize>()
        }
        None => oid.arcs().iter().map(|&a| base128_length(a)).sum(),
    }
}

fn encode_oid<S: OctetSink + ?Sized>(oid: &ObjectIdentifier, sink: &mut S) -> EmberResult<()> {
    let first = oid_first_subidentifier(oid).ok_or_else(|| {
        EmberError::InvalidData(format!("Invalid object identifier {:?}", oid.to_string()))
    })?;
    encode_base128(first, sink)?;
    for &arc in &oid.arcs()[2..] {
        encode_base128(arc, sink)?;
    }
    Ok(())
}

fn decode_oid(bytes: &[u8]) -> EmberResult<ObjectIdentifier> {
    if bytes.is_empty() {
        return Err(EmberError::Asn1Decoding(
            "Empty object identifier encoding".to_string(),
        ));
    }

    let mut pos = 0;
    let first = decode_base128(bytes, &mut pos)?;
    let (x, y) = match first {
        0..=39 => (0, first),
        40..=79 => (1, first - 40),
        _ => (2, first - 80),
    };

    let mut oid = ObjectIdentifier::from_arcs(vec![x, y]);
    while pos < bytes.len() {
        oid.push(decode_base128(bytes, &mut pos)?);
    }
    Ok(oid)
}

fn relative_oid_length(oid: &ObjectIdentifier) -> usize {
    oid.arcs().iter().map(|&a| base128_length(a)).sum()
}

fn decode_relative_oid(bytes: &[u8]) -> EmberResult<ObjectIdentifier> {
    let mut pos = 0;
    let mut oid = ObjectIdentifier::new();
    while pos < bytes.len() {
        oid.push(decode_base128(bytes, &mut pos)?);
    }
    Ok(oid)
}

// ---------------------------------------------------------------------------
// Value dispatch

/// Universal tag of a value
pub fn universal_tag(value: &Value) -> Tag {
    Tag::universal(false, value.universal_tag_number())
}

/// Number of contents octets of a value (without tag and length)
pub fn encoded_length(value: &Value) -> usize {
    match value {
        Value::Boolean(_) => 1,
        Value::Integer(v) => integer_length(*v),
        Value::Real(v) => real_encoding(*v).len,
        Value::Utf8String(v) => v.len(),
        Value::OctetString(v) => v.len(),
        Value::ObjectIdentifier(v) => oid_length(v),
        Value::RelativeObjectIdentifier(v) => relative_oid_length(v),
        Value::Null => 0,
    }
}

/// Number of octets of the complete universal TLV of a value
pub fn tlv_length(value: &Value) -> usize {
    let payload = encoded_length(value);
    universal_tag(value).encoded_length() + crate::types::Length::new(payload).encoded_length() + payload
}

/// Encode the contents octets of a value
pub fn encode_payload<S: OctetSink + ?Sized>(value: &Value, sink: &mut S) -> EmberResult<()> {
    match value {
        Value::Boolean(v) => sink.write_byte(if *v { 0xFF } else { 0x00 }),
        Value::Integer(v) => encode_integer(*v, sink),
        Value::Real(v) => sink.write_bytes(real_encoding(*v).as_slice()),
        Value::Utf8String(v) => sink.write_bytes(v.as_bytes()),
        Value::OctetString(v) => sink.write_bytes(v),
        Value::ObjectIdentifier(v) => encode_oid(v, sink),
        Value::RelativeObjectIdentifier(v) => {
            for &arc in v.arcs() {
                encode_base128(arc, sink)?;
            }
            Ok(())
        }
        Value::Null => Ok(()),
    }
}

/// Decode contents octets as the given value type
pub fn decode_payload(value_type: ValueType, bytes: &[u8]) -> EmberResult<Value> {
    match value_type {
        ValueType::Boolean => {
            if bytes.len() != 1 {
                return Err(EmberError::Asn1Decoding(format!(
                    "BOOLEAN must be 1 octet, got {}",
                    bytes.len()
                )));
            }
            Ok(Value::Boolean(bytes[0] != 0))
        }
        ValueType::Integer => decode_integer_payload(bytes).map(Value::Integer),
        ValueType::Real => decode_real_payload(bytes).map(Value::Real),
        ValueType::Utf8String => String::from_utf8(bytes.to_vec())
            .map(Value::Utf8String)
            .map_err(|_| EmberError::Asn1Decoding("Invalid UTF-8 in UTF8String".to_string())),
        ValueType::OctetString => Ok(Value::OctetString(bytes.to_vec())),
        ValueType::ObjectIdentifier => decode_oid(bytes).map(Value::ObjectIdentifier),
        ValueType::RelativeObjectIdentifier => {
            decode_relative_oid(bytes).map(Value::RelativeObjectIdentifier)
        }
        ValueType::Null => {
            if !bytes.is_empty() {
                return Err(EmberError::Asn1Decoding(format!(
                    "NULL must be empty, got {} octets",
                    bytes.len()
                )));
            }
            Ok(Value::Null)
        }
    }
}

/// Map a universal primitive type tag to a value type
pub fn value_type_of(type_tag: Tag) -> EmberResult<ValueType> {
    if type_tag.class() != TagClass::Universal || type_tag.is_container() {
        return Err(EmberError::UnsupportedType(format!(
            "{} is not a universal primitive type",
            type_tag
        )));
    }
    ValueType::from_universal_tag_number(type_tag.number())
        .ok_or_else(|| EmberError::UnsupportedType(format!("Universal type {}", type_tag.number())))
}

/// Decode a value whose type is given by its universal tag
pub fn decode_value(type_tag: Tag, bytes: &[u8]) -> EmberResult<Value> {
    decode_payload(value_type_of(type_tag)?, bytes)
}

/// Validate that `type_tag` is the universal tag of `expected`
pub fn expect_type(type_tag: Tag, expected: ValueType) -> EmberResult<()> {
    if type_tag != Tag::universal(false, expected.universal_tag_number()) {
        return Err(EmberError::TypeMismatch {
            expected: expected.to_string(),
            found: type_tag.to_string(),
        });
    }
    Ok(())
}

/// Decode contents octets that must be an INTEGER
pub fn decode_integer(type_tag: Tag, bytes: &[u8]) -> EmberResult<i64> {
    expect_type(type_tag, ValueType::Integer)?;
    decode_integer_payload(bytes)
}

/// Decode contents octets that must be a REAL
pub fn decode_real(type_tag: Tag, bytes: &[u8]) -> EmberResult<f64> {
    expect_type(type_tag, ValueType::Real)?;
    decode_real_payload(bytes)
}

/// Decode contents octets that must be a BOOLEAN
pub fn decode_boolean(type_tag: Tag, bytes: &[u8]) -> EmberResult<bool> {
    expect_type(type_tag, ValueType::Boolean)?;
    match bytes {
        [byte] => Ok(*byte != 0),
        _ => Err(EmberError::Asn1Decoding(format!(
            "BOOLEAN must be 1 octet, got {}",
            bytes.len()
        ))),
    }
}

/// Decode contents octets that must be a UTF8String
pub fn decode_string(type_tag: Tag, bytes: &[u8]) -> EmberResult<String> {
    expect_type(type_tag, ValueType::Utf8String)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| EmberError::Asn1Decoding("Invalid UTF-8 in UTF8String".to_string()))
}

/// Decode contents octets that must be a RELATIVE-OID
pub fn decode_relative_object_identifier(type_tag: Tag, bytes: &[u8]) -> EmberResult<ObjectIdentifier> {
    expect_type(type_tag, ValueType::RelativeObjectIdentifier)?;
    decode_relative_oid(bytes)
}
