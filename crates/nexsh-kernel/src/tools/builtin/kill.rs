//! kill — Signal a process.

use nexsh_types::Object;

use crate::tools::{Builtin, CommandContext};

/// Acknowledges a signal request for the given pid. Delivery goes
/// through the host's process services, which validate the pid and the
/// `proc:kill` capability.
pub struct Kill;

impl Builtin for Kill {
    fn name(&self) -> &str {
        "kill"
    }

    fn help(&self) -> &str {
        "Signal a process (kill pid)"
    }

    fn execute(&self, ctx: &CommandContext) -> Object {
        let pid = match ctx.arg(0) {
            Some(pid) => pid,
            None => return Object::error("kill: missing pid"),
        };
        match ctx.host.proc_kill(pid) {
            Ok(message) => Object::text(message),
            Err(e) => Object::error(format!("kill: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledges_numeric_pid() {
        let ctx = CommandContext::for_test(vec!["4242"]);
        let result = Kill.execute(&ctx);
        assert!(!result.is_error());
        assert!(result.value.as_text().unwrap().contains("4242"));
    }

    #[test]
    fn rejects_non_numeric_pid() {
        let ctx = CommandContext::for_test(vec!["not-a-pid"]);
        assert!(Kill.execute(&ctx).is_error());
    }

    #[test]
    fn missing_pid_is_an_error() {
        let ctx = CommandContext::for_test(vec![]);
        assert!(Kill.execute(&ctx).is_error());
    }
}
