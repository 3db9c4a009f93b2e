//! cat — Concatenate and print files.

use nexsh_types::Object;

use crate::tools::{Builtin, CommandContext};

/// Prints the contents of each named file in order. If any file cannot
/// be opened the whole invocation fails with an error object.
pub struct Cat;

impl Builtin for Cat {
    fn name(&self) -> &str {
        "cat"
    }

    fn help(&self) -> &str {
        "Print file contents (cat path...)"
    }

    fn execute(&self, ctx: &CommandContext) -> Object {
        if ctx.args.is_empty() {
            return Object::error("cat: missing operand");
        }

        let mut out = String::new();
        for path in &ctx.args {
            if !ctx.gate.check_permission("fs:read", path) {
                return Object::error(format!("cat: permission denied: {path}"));
            }
            match std::fs::read_to_string(path) {
                Ok(contents) => out.push_str(&contents),
                Err(e) => return Object::error(format!("cat: {path}: {e}")),
            }
        }
        Object::text(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_in_argument_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "first\n").unwrap();
        std::fs::write(&b, "second\n").unwrap();

        let ctx = CommandContext::for_test(vec![a.to_str().unwrap(), b.to_str().unwrap()]);
        let result = Cat.execute(&ctx);
        assert_eq!(result.value.as_text().unwrap(), "first\nsecond\n");
    }

    #[test]
    fn any_unreadable_file_fails_the_call() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        std::fs::write(&a, "first").unwrap();

        let ctx = CommandContext::for_test(vec![a.to_str().unwrap(), "/no/such/file"]);
        let result = Cat.execute(&ctx);
        assert!(result.is_error());
    }

    #[test]
    fn missing_operand_is_an_error() {
        let ctx = CommandContext::for_test(vec![]);
        assert!(Cat.execute(&ctx).is_error());
    }
}
