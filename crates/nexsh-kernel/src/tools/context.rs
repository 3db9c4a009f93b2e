use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::bridge::HostServices;
use crate::gate::PermissionGate;
use crate::parser::ParsedCommand;

/// Everything a builtin sees when it runs: the parsed argument vector,
/// the flag map, the working directory snapshot, and handles to the
/// permission gate and host services.
pub struct CommandContext {
    pub args: Vec<String>,
    pub flags: HashMap<String, String>,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    pub gate: Arc<PermissionGate>,
    pub host: Arc<HostServices>,
}

impl CommandContext {
    pub fn from_parsed(
        cmd: &ParsedCommand,
        gate: Arc<PermissionGate>,
        host: Arc<HostServices>,
    ) -> Self {
        Self {
            args: cmd.args.clone(),
            flags: cmd.flags.clone(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env: std::env::vars().collect(),
            gate,
            host,
        }
    }

    /// Positional argument by index, if present.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Flag value by key. Bare flags carry the value `"true"`.
    pub fn flag(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }

    pub fn has_flag(&self, key: &str) -> bool {
        self.flags.contains_key(key)
    }

    #[cfg(test)]
    pub fn for_test(args: Vec<&str>) -> Self {
        use crate::budget::MemoryBudget;

        let gate = Arc::new(PermissionGate::new());
        let budget = Arc::new(MemoryBudget::new(64 * 1024 * 1024));
        let host = Arc::new(HostServices::new(gate.clone(), budget));
        Self {
            args: args.into_iter().map(String::from).collect(),
            flags: HashMap::new(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env: HashMap::new(),
            gate,
            host,
        }
    }
}
