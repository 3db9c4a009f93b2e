//! ls — List directory contents.

use nexsh_types::Object;

use crate::tools::{Builtin, CommandContext};

/// Lists entries of the target directory (default `.`), one name per
/// line, sorted. Every entry is listed, dotfiles included.
pub struct Ls;

impl Builtin for Ls {
    fn name(&self) -> &str {
        "ls"
    }

    fn help(&self) -> &str {
        "List directory contents (ls [path])"
    }

    fn execute(&self, ctx: &CommandContext) -> Object {
        let path = ctx.arg(0).unwrap_or(".");
        if !ctx.gate.check_permission("fs:list", path) {
            return Object::error(format!("ls: permission denied: {path}"));
        }

        let entries = match std::fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => return Object::error(format!("ls: cannot access '{path}': {e}")),
        };

        let mut names: Vec<String> = entries
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        Object::text(names.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexsh_types::TypeTag;

    #[test]
    fn lists_sorted_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("beta.txt"), "b").unwrap();
        std::fs::write(dir.path().join("alpha.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let ctx = CommandContext::for_test(vec![dir.path().to_str().unwrap()]);
        let result = Ls.execute(&ctx);
        assert_eq!(result.meta.tag, TypeTag::Text);
        assert_eq!(result.value.as_text().unwrap(), "alpha.txt\nbeta.txt\nsub");
    }

    #[test]
    fn lists_dotfiles() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".hidden"), "").unwrap();
        std::fs::write(dir.path().join("seen"), "").unwrap();

        let ctx = CommandContext::for_test(vec![dir.path().to_str().unwrap()]);
        let result = Ls.execute(&ctx);
        assert_eq!(result.value.as_text().unwrap(), ".hidden\nseen");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let ctx = CommandContext::for_test(vec!["/no/such/dir"]);
        let result = Ls.execute(&ctx);
        assert!(result.is_error());
    }
}
