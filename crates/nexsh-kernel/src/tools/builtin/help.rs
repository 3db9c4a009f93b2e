//! help — List registered commands.

use std::fmt::Write as _;
use std::sync::{Arc, Weak};

use nexsh_types::Object;

use crate::tools::{Builtin, BuiltinRegistry, CommandContext};

/// Prints every registered command with its usage line, or the usage
/// line of a single named command. Holds a weak handle back to the
/// registry so the registry can own it without a reference cycle.
pub struct Help {
    registry: Weak<BuiltinRegistry>,
}

impl Help {
    pub fn new(registry: &Arc<BuiltinRegistry>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
        }
    }
}

impl Builtin for Help {
    fn name(&self) -> &str {
        "help"
    }

    fn help(&self) -> &str {
        "Show available commands (help [command])"
    }

    fn execute(&self, ctx: &CommandContext) -> Object {
        let registry = match self.registry.upgrade() {
            Some(registry) => registry,
            None => return Object::error("help: registry unavailable"),
        };

        if let Some(name) = ctx.arg(0) {
            return match registry.help_for(name) {
                Some(help) => Object::text(format!("{name}: {help}")),
                None => Object::error(format!("help: unknown command: {name}")),
            };
        }

        let mut out = String::from("Available commands:");
        for name in registry.names() {
            let help = registry.help_for(&name).unwrap_or_default();
            let _ = write!(out, "\n  {name:<8} {help}");
        }
        Object::text(out)
    }
}
