//! Value types for nexsh results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A result value.
///
/// A closed variant set: exactly one variant is active at a time, and
/// every consumer matches exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Raw binary data (file contents, network payloads).
    Bytes(Vec<u8>),
}

impl Value {
    /// The type tag that agrees with the active variant.
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Bool,
            Value::Int(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Text(_) => TypeTag::Text,
            Value::Bytes(_) => TypeTag::Bytes,
        }
    }

    /// Approximate payload size in bytes, used for the metadata envelope
    /// and memory-budget accounting.
    pub fn byte_size(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 8,
            Value::Text(s) => s.len(),
            Value::Bytes(b) => b.len(),
        }
    }

    /// The text payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Type tag carried in every object's metadata.
///
/// The first six tags mirror the [`Value`] variants. The remaining three
/// are sentinels used for out-of-band signaling: `Error` marks a failure
/// payload (a descriptive text value), `Exit` asks the frontend loop to
/// terminate, and `Object` marks a foreign value that could not be
/// marshaled into the closed variant set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Null,
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    Error,
    Exit,
    Object,
}

impl TypeTag {
    /// True for the sentinel tags that do not correspond to a variant.
    pub fn is_sentinel(self) -> bool {
        matches!(self, TypeTag::Error | TypeTag::Exit | TypeTag::Object)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Null => "null",
            TypeTag::Bool => "boolean",
            TypeTag::Int => "integer",
            TypeTag::Float => "float",
            TypeTag::Text => "string",
            TypeTag::Bytes => "bytes",
            TypeTag::Error => "error",
            TypeTag::Exit => "exit",
            TypeTag::Object => "object",
        };
        write!(f, "{name}")
    }
}
