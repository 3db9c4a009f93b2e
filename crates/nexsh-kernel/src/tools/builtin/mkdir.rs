//! mkdir — Create directories.

use nexsh_types::Object;

use crate::tools::{Builtin, CommandContext};

/// Creates each named directory. `-p` creates missing parents and
/// tolerates directories that already exist.
pub struct Mkdir;

impl Builtin for Mkdir {
    fn name(&self) -> &str {
        "mkdir"
    }

    fn help(&self) -> &str {
        "Create directories (mkdir [-p] path...)"
    }

    fn execute(&self, ctx: &CommandContext) -> Object {
        if ctx.args.is_empty() {
            return Object::error("mkdir: missing operand");
        }

        let parents = ctx.has_flag("p") || ctx.has_flag("parents");
        for path in &ctx.args {
            if !ctx.gate.check_permission("fs:write", path) {
                return Object::error(format!("mkdir: permission denied: {path}"));
            }
            let result = if parents {
                std::fs::create_dir_all(path)
            } else {
                std::fs::create_dir(path)
            };
            if let Err(e) = result {
                return Object::error(format!("mkdir: cannot create '{path}': {e}"));
            }
        }
        let created: Vec<String> = ctx
            .args
            .iter()
            .map(|path| format!("directory created: {path}"))
            .collect();
        Object::text(created.join("\n"))
    }
}
