//! Built-in command system.
//!
//! Every traditional command resolves against the [`BuiltinRegistry`]; the
//! registry maps exact names to [`Builtin`] handlers. Registration
//! overwrites — last registration wins — and unknown names fall through to
//! the external-process collaborator in the execution engine.

pub mod builtin;
mod context;
mod registry;
mod traits;

pub use builtin::register_builtins;
pub use context::CommandContext;
pub use registry::BuiltinRegistry;
pub use traits::{Builtin, FnBuiltin};
