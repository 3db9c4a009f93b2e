//! mv — Move or rename a file.

use nexsh_types::Object;

use crate::tools::{Builtin, CommandContext};

pub struct Mv;

impl Builtin for Mv {
    fn name(&self) -> &str {
        "mv"
    }

    fn help(&self) -> &str {
        "Move or rename a file (mv source dest)"
    }

    fn execute(&self, ctx: &CommandContext) -> Object {
        let (src, dst) = match (ctx.arg(0), ctx.arg(1)) {
            (Some(src), Some(dst)) => (src, dst),
            _ => return Object::error("mv: missing file operand"),
        };
        if !ctx.gate.check_permission("fs:write", src) {
            return Object::error(format!("mv: permission denied: {src}"));
        }
        if !ctx.gate.check_permission("fs:write", dst) {
            return Object::error(format!("mv: permission denied: {dst}"));
        }

        match std::fs::rename(src, dst) {
            Ok(()) => Object::text(format!("moved '{src}' to '{dst}'")),
            Err(e) => Object::error(format!("mv: cannot move '{src}' to '{dst}': {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renames_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("old.txt");
        let dst = dir.path().join("new.txt");
        std::fs::write(&src, "payload").unwrap();

        let ctx = CommandContext::for_test(vec![src.to_str().unwrap(), dst.to_str().unwrap()]);
        let result = Mv.execute(&ctx);
        assert_eq!(result.meta.tag, nexsh_types::TypeTag::Text);
        assert!(result.value.as_text().unwrap().starts_with("moved"));
        assert!(!src.exists());
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "payload");
    }

    #[test]
    fn missing_operand_is_an_error() {
        let ctx = CommandContext::for_test(vec![]);
        assert!(Mv.execute(&ctx).is_error());
    }
}
