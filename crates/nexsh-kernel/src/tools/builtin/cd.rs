//! cd — Change working directory.

use nexsh_types::Object;

use crate::tools::{Builtin, CommandContext};

/// Changes the process working directory. With no argument, goes to
/// `$HOME`. Returns the new working directory; failures come back as
/// error objects.
pub struct Cd;

impl Builtin for Cd {
    fn name(&self) -> &str {
        "cd"
    }

    fn help(&self) -> &str {
        "Change working directory (cd [path])"
    }

    fn execute(&self, ctx: &CommandContext) -> Object {
        let target = match ctx.arg(0) {
            Some(path) => path.to_string(),
            None => match std::env::var("HOME") {
                Ok(home) => home,
                Err(_) => return Object::error("cd: HOME not set"),
            },
        };

        match std::env::set_current_dir(&target) {
            Ok(()) => {
                let cwd = std::env::current_dir()
                    .map(|p| p.display().to_string())
                    .unwrap_or(target);
                Object::text(cwd)
            }
            Err(e) => Object::error(format!("cd: {target}: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexsh_types::TypeTag;

    #[test]
    fn missing_directory_is_an_error() {
        let ctx = CommandContext::for_test(vec!["/no/such/dir"]);
        let result = Cd.execute(&ctx);
        assert!(result.is_error());
        assert!(result.error_message().unwrap().contains("/no/such/dir"));
    }

    #[test]
    fn returns_new_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CommandContext::for_test(vec![dir.path().to_str().unwrap()]);
        let result = Cd.execute(&ctx);
        assert_eq!(result.meta.tag, TypeTag::Text);
        let reported = result.value.as_text().unwrap();
        assert_eq!(
            std::fs::canonicalize(reported).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }
}
