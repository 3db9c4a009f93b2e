//! nexsh-types: the tagged value and object model.
//!
//! Every execution path in nexsh — builtins, pipelines, external commands,
//! script evaluation — produces an [`Object`]: a [`Value`] wrapped in a
//! metadata envelope with a monotonically increasing identifier.
//!
//! This crate has no knowledge of the kernel; it is the leaf of the
//! dependency graph.

mod object;
mod value;

pub use object::{next_object_id, NativeHandle, Object, ObjectId, ObjectMeta};
pub use value::{TypeTag, Value};
