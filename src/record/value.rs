//! Field values.
use std::fmt;
use std::hash::Hasher;

use serde::Serialize;

use super::FieldType;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
}

impl Value {
    /// checks that the value can be held by a field of type `field_type`.
    pub fn conforms_to(&self, field_type: &FieldType) -> bool {
        match (self, field_type) {
            (Value::Null, FieldType::Null) => true,
            (Value::Boolean(_), FieldType::Boolean) => true,
            (Value::Int(_), FieldType::Int) => true,
            (Value::Long(_), FieldType::Long) => true,
            (Value::Float(_), FieldType::Float) => true,
            (Value::Double(_), FieldType::Double) => true,
            (Value::Bytes(_), FieldType::Bytes) => true,
            (Value::String(_), FieldType::String) => true,
            (Value::Null, FieldType::Nullable(_)) => true,
            (v, FieldType::Nullable(inner)) => v.conforms_to(inner),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Feeds a byte representation of the value into `hasher`.
    ///
    /// Numbers are written little-endian and variable-length values are
    /// length-prefixed, so that the output does not depend on the platform.
    pub(crate) fn hash_into<H: Hasher>(&self, hasher: &mut H) {
        match self {
            Value::Null => hasher.write_u8(0),
            Value::Boolean(b) => {
                hasher.write_u8(1);
                hasher.write_u8(u8::from(*b));
            }
            Value::Int(i) => {
                hasher.write_u8(2);
                hasher.write(&i.to_le_bytes());
            }
            Value::Long(l) => {
                hasher.write_u8(3);
                hasher.write(&l.to_le_bytes());
            }
            Value::Float(f) => {
                hasher.write_u8(4);
                hasher.write(&f.to_bits().to_le_bytes());
            }
            Value::Double(d) => {
                hasher.write_u8(5);
                hasher.write(&d.to_bits().to_le_bytes());
            }
            Value::Bytes(b) => {
                hasher.write_u8(6);
                hasher.write(&(b.len() as u64).to_le_bytes());
                hasher.write(b);
            }
            Value::String(s) => {
                hasher.write_u8(7);
                hasher.write(&(s.len() as u64).to_le_bytes());
                hasher.write(s.as_bytes());
            }
        }
    }
}

/// Textual rendering of a value, as fed to the time normalizer.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Long(l) => write!(f, "{l}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Value::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
