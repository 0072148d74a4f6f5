//! Value sum type for Ember+ leaves

use crate::oid::ObjectIdentifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value held by a leaf of the tree model
///
/// A closed set of the primitive ASN.1 types Ember+ transports. Every
/// variant maps to exactly one BER universal tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// BOOLEAN
    Boolean(bool),
    /// INTEGER, at most 64 bits
    Integer(i64),
    /// REAL (IEEE-754 double)
    Real(f64),
    /// UTF8String
    Utf8String(String),
    /// OCTET STRING
    OctetString(Vec<u8>),
    /// OBJECT IDENTIFIER
    ObjectIdentifier(ObjectIdentifier),
    /// RELATIVE-OID
    RelativeObjectIdentifier(ObjectIdentifier),
    /// NULL
    Null,
}

/// Type enumeration for Value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Boolean,
    Integer,
    Real,
    Utf8String,
    OctetString,
    ObjectIdentifier,
    RelativeObjectIdentifier,
    Null,
}

impl ValueType {
    /// BER universal tag number of this type
    pub fn universal_tag_number(self) -> u32 {
        match self {
            ValueType::Boolean => 1,
            ValueType::Integer => 2,
            ValueType::OctetString => 4,
            ValueType::Null => 5,
            ValueType::ObjectIdentifier => 6,
            ValueType::Real => 9,
            ValueType::Utf8String => 12,
            ValueType::RelativeObjectIdentifier => 13,
        }
    }

    /// Look up the value type for a universal tag number
    pub fn from_universal_tag_number(number: u32) -> Option<Self> {
        match number {
            1 => Some(ValueType::Boolean),
            2 => Some(ValueType::Integer),
            4 => Some(ValueType::OctetString),
            5 => Some(ValueType::Null),
            6 => Some(ValueType::ObjectIdentifier),
            9 => Some(ValueType::Real),
            12 => Some(ValueType::Utf8String),
            13 => Some(ValueType::RelativeObjectIdentifier),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Boolean => "BOOLEAN",
            ValueType::Integer => "INTEGER",
            ValueType::Real => "REAL",
            ValueType::Utf8String => "UTF8String",
            ValueType::OctetString => "OCTET STRING",
            ValueType::ObjectIdentifier => "OBJECT IDENTIFIER",
            ValueType::RelativeObjectIdentifier => "RELATIVE-OID",
            ValueType::Null => "NULL",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Get the type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Real(_) => ValueType::Real,
            Value::Utf8String(_) => ValueType::Utf8String,
            Value::OctetString(_) => ValueType::OctetString,
            Value::ObjectIdentifier(_) => ValueType::ObjectIdentifier,
            Value::RelativeObjectIdentifier(_) => ValueType::RelativeObjectIdentifier,
            Value::Null => ValueType::Null,
        }
    }

    /// BER universal tag number of this value
    pub fn universal_tag_number(&self) -> u32 {
        self.value_type().universal_tag_number()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a real number
    ///
    /// Integers widen to reals: providers may send a whole-number real
    /// parameter value as an INTEGER.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(v) => Some(v),
            _ => None,
        }
    }

    /// Get the arcs of an OBJECT IDENTIFIER or RELATIVE-OID
    pub fn as_oid(&self) -> Option<&ObjectIdentifier> {
        match self {
            Value::ObjectIdentifier(v) | Value::RelativeObjectIdentifier(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Utf8String(v) => write!(f, "{:?}", v),
            Value::OctetString(v) => {
                for byte in v {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            Value::ObjectIdentifier(v) | Value::RelativeObjectIdentifier(v) => write!(f, "{}", v),
            Value::Null => f.write_str("null"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::OctetString(v)
    }
}

/// Conversion out of a [`Value`] for typed leaf access
///
/// Returns `None` when the value holds a different type, letting callers
/// substitute a default the way optional wire properties behave.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer()
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer().and_then(|v| i32::try_from(v).ok())
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer().and_then(|v| u32::try_from(v).ok())
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_real()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bytes().map(<[u8]>::to_vec)
    }
}

impl FromValue for ObjectIdentifier {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_oid().cloned()
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}
