//! rm — Remove files and directories.

use nexsh_types::Object;

use crate::tools::{Builtin, CommandContext};

/// Removes each named path. Directories are removed recursively.
pub struct Rm;

impl Builtin for Rm {
    fn name(&self) -> &str {
        "rm"
    }

    fn help(&self) -> &str {
        "Remove files and directories (rm path...)"
    }

    fn execute(&self, ctx: &CommandContext) -> Object {
        if ctx.args.is_empty() {
            return Object::error("rm: missing operand");
        }

        for path in &ctx.args {
            if !ctx.gate.check_permission("fs:write", path) {
                return Object::error(format!("rm: permission denied: {path}"));
            }
            let meta = match std::fs::symlink_metadata(path) {
                Ok(meta) => meta,
                Err(e) => return Object::error(format!("rm: cannot remove '{path}': {e}")),
            };
            let result = if meta.is_dir() {
                std::fs::remove_dir_all(path)
            } else {
                std::fs::remove_file(path)
            };
            if let Err(e) = result {
                return Object::error(format!("rm: cannot remove '{path}': {e}"));
            }
        }
        let removed: Vec<String> = ctx
            .args
            .iter()
            .map(|path| format!("removed: {path}"))
            .collect();
        Object::text(removed.join("\n"))
    }
}
