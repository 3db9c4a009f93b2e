//! The nexsh kernel.
//!
//! Everything between a line of input and its result object lives here:
//! the dual-syntax [`parser`], the builtin registry and [`engine`], the
//! OS-thread worker [`pool`], the scripting [`bridge`], the permission
//! [`gate`], the memory [`budget`], and the [`kernel`] orchestrator that
//! wires them together and is the single entry point for hosting loops.

pub mod bridge;
pub mod budget;
pub mod engine;
pub mod gate;
pub mod kernel;
pub mod parser;
pub mod pool;
pub mod tools;

pub use engine::ExecutionEngine;
pub use gate::PermissionGate;
pub use kernel::{Kernel, KernelConfig, PerformanceMetrics};
pub use parser::{CommandParser, ParsedCommand, ParsedInput};
pub use pool::{PoolError, TaskHandle, WorkerPool};
pub use tools::{Builtin, BuiltinRegistry, CommandContext};
