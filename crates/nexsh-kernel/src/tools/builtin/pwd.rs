//! pwd — Print working directory.

use nexsh_types::Object;

use crate::tools::{Builtin, CommandContext};

pub struct Pwd;

impl Builtin for Pwd {
    fn name(&self) -> &str {
        "pwd"
    }

    fn help(&self) -> &str {
        "Print current working directory"
    }

    fn execute(&self, ctx: &CommandContext) -> Object {
        Object::text(ctx.cwd.to_string_lossy().into_owned())
    }
}
