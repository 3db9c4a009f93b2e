//! Scripting bridge — the contract between the kernel and an embedded
//! scripting engine.
//!
//! The kernel never evaluates scripts itself. It classifies input as a
//! script payload and hands it to an opaque [`ScriptEngine`], passing the
//! [`HostServices`] table (the `nexus` namespace: fs / process / network)
//! the engine may call back into. The engine returns a [`ForeignValue`],
//! which [`foreign_to_object`] marshals into the uniform object model.

mod host;

pub use host::{DirEntry, FileStat, HostServices, ProcInfo, WatchRegistration};

use nexsh_types::{Object, TypeTag, Value};
use thiserror::Error;

/// Failures inside a scripting host call (the `nexus.*` method table).
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("permission denied: {capability} on {resource}")]
    PermissionDenied {
        capability: String,
        resource: String,
    },
    #[error("{0} is not supported by this kernel build")]
    Unsupported(&'static str),
    #[error("invalid argument: {0}")]
    BadArgument(String),
    #[error(transparent)]
    Budget(#[from] crate::budget::BudgetExceeded),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures during script evaluation, distinct from ordinary execution
/// errors.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("no scripting engine is configured")]
    EngineUnavailable,
    #[error("evaluation failed: {0}")]
    Eval(String),
    #[error(transparent)]
    Host(#[from] BridgeError),
}

/// The value shape on the engine side of the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ForeignValue {
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Anything the conversion rules cannot express.
    Opaque,
}

/// The opaque evaluator contract implemented by an external scripting
/// engine collaborator.
pub trait ScriptEngine: Send + Sync {
    /// Evaluate a script payload. `host` is the capability-scoped call
    /// context the script reaches the system through.
    fn eval(&self, source: &str, host: &HostServices) -> Result<ForeignValue, ScriptError>;
}

/// Default engine for kernels built without an embedded interpreter:
/// classification and routing still work, evaluation reports a distinct
/// script error.
pub struct UnavailableEngine;

impl ScriptEngine for UnavailableEngine {
    fn eval(&self, _source: &str, _host: &HostServices) -> Result<ForeignValue, ScriptError> {
        Err(ScriptError::EngineUnavailable)
    }
}

/// Marshal a foreign value into an [`Object`], stamping a fresh
/// identifier.
///
/// Integral numbers become signed 64-bit integers, everything else the
/// rules cannot express becomes an object-tagged placeholder.
pub fn foreign_to_object(value: ForeignValue) -> Object {
    match value {
        ForeignValue::Null | ForeignValue::Undefined => Object::null(),
        ForeignValue::Bool(b) => Object::from_value(Value::Bool(b)),
        ForeignValue::Number(n) => {
            if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
                Object::from_value(Value::Int(n as i64))
            } else {
                Object::from_value(Value::Float(n))
            }
        }
        ForeignValue::Text(s) => Object::from_value(Value::Text(s)),
        ForeignValue::Bytes(b) => Object::from_value(Value::Bytes(b)),
        ForeignValue::Opaque => Object::new(TypeTag::Object, Value::Text("[Object]".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_undefined_convert_to_null() {
        assert_eq!(foreign_to_object(ForeignValue::Null).meta.tag, TypeTag::Null);
        assert_eq!(
            foreign_to_object(ForeignValue::Undefined).meta.tag,
            TypeTag::Null
        );
    }

    #[test]
    fn integral_number_becomes_int() {
        let obj = foreign_to_object(ForeignValue::Number(42.0));
        assert_eq!(obj.value, Value::Int(42));
    }

    #[test]
    fn fractional_number_becomes_float() {
        let obj = foreign_to_object(ForeignValue::Number(1.5));
        assert_eq!(obj.value, Value::Float(1.5));
    }

    #[test]
    fn opaque_becomes_object_placeholder() {
        let obj = foreign_to_object(ForeignValue::Opaque);
        assert_eq!(obj.meta.tag, TypeTag::Object);
        assert_eq!(obj.value, Value::Text("[Object]".into()));
    }

    #[test]
    fn conversions_stamp_fresh_ids() {
        let a = foreign_to_object(ForeignValue::Bool(true));
        let b = foreign_to_object(ForeignValue::Bool(true));
        assert!(b.meta.id > a.meta.id);
    }
}
