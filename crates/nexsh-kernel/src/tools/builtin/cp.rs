//! cp — Copy a file.

use nexsh_types::Object;

use crate::tools::{Builtin, CommandContext};

pub struct Cp;

impl Builtin for Cp {
    fn name(&self) -> &str {
        "cp"
    }

    fn help(&self) -> &str {
        "Copy a file (cp source dest)"
    }

    fn execute(&self, ctx: &CommandContext) -> Object {
        let (src, dst) = match (ctx.arg(0), ctx.arg(1)) {
            (Some(src), Some(dst)) => (src, dst),
            _ => return Object::error("cp: missing file operand"),
        };
        if !ctx.gate.check_permission("fs:read", src) {
            return Object::error(format!("cp: permission denied: {src}"));
        }
        if !ctx.gate.check_permission("fs:write", dst) {
            return Object::error(format!("cp: permission denied: {dst}"));
        }

        match std::fs::copy(src, dst) {
            Ok(_) => Object::text(format!("copied '{src}' to '{dst}'")),
            Err(e) => Object::error(format!("cp: cannot copy '{src}' to '{dst}': {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        std::fs::write(&src, "payload").unwrap();

        let ctx = CommandContext::for_test(vec![src.to_str().unwrap(), dst.to_str().unwrap()]);
        let result = Cp.execute(&ctx);
        assert_eq!(result.meta.tag, nexsh_types::TypeTag::Text);
        assert!(result.value.as_text().unwrap().starts_with("copied"));
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "payload");
        assert!(src.exists());
    }

    #[test]
    fn missing_operand_is_an_error() {
        let ctx = CommandContext::for_test(vec!["only-one"]);
        assert!(Cp.execute(&ctx).is_error());
    }
}
