//! exit — Request shell termination.

use nexsh_types::Object;

use crate::tools::{Builtin, CommandContext};

/// Returns an exit-tagged object. The builtin never terminates the
/// process itself; the hosting loop watches for the tag and shuts the
/// kernel down in order.
pub struct Exit;

impl Builtin for Exit {
    fn name(&self) -> &str {
        "exit"
    }

    fn help(&self) -> &str {
        "Exit the shell"
    }

    fn execute(&self, _ctx: &CommandContext) -> Object {
        Object::exit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexsh_types::TypeTag;

    #[test]
    fn returns_exit_tag() {
        let ctx = CommandContext::for_test(vec![]);
        let result = Exit.execute(&ctx);
        assert!(result.is_exit());
        assert_eq!(result.meta.tag, TypeTag::Exit);
        assert_eq!(result.value.as_text().unwrap(), "Goodbye!");
    }
}
