//! ps — List known processes.

use std::fmt::Write as _;

use nexsh_types::Object;

use crate::tools::{Builtin, CommandContext};

/// Reports the process table the host exposes. At minimum this is the
/// shell's own process.
pub struct Ps;

impl Builtin for Ps {
    fn name(&self) -> &str {
        "ps"
    }

    fn help(&self) -> &str {
        "List processes"
    }

    fn execute(&self, ctx: &CommandContext) -> Object {
        let procs = match ctx.host.proc_list() {
            Ok(procs) => procs,
            Err(e) => return Object::error(format!("ps: {e}")),
        };

        let mut out = String::from("PID\tCOMMAND");
        for p in procs {
            let _ = write!(out, "\n{}\t{}", p.pid, p.command);
        }
        Object::text(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_own_process() {
        let ctx = CommandContext::for_test(vec![]);
        let result = Ps.execute(&ctx);
        let text = result.value.as_text().unwrap();
        assert!(text.starts_with("PID\tCOMMAND"));
        assert!(text.contains(&std::process::id().to_string()));
    }
}
