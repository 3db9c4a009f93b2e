//! The builtin command trait.

use nexsh_types::Object;

use super::context::CommandContext;

/// A built-in command handler.
///
/// Handlers return a string-tagged object on success or an error-tagged
/// object on failure, and must not panic past their own boundary — the
/// engine converts escaped panics into error objects, but a well-behaved
/// builtin never relies on that.
pub trait Builtin: Send + Sync {
    /// The exact name the registry keys on.
    fn name(&self) -> &str;

    /// One-line usage text for `help`.
    fn help(&self) -> &str;

    /// Execute with the prepared context.
    fn execute(&self, ctx: &CommandContext) -> Object;
}

/// Adapter that turns a closure into a [`Builtin`], for embedders that
/// register commands without declaring a type.
pub struct FnBuiltin<F> {
    name: String,
    help: String,
    handler: F,
}

impl<F> FnBuiltin<F>
where
    F: Fn(&CommandContext) -> Object + Send + Sync,
{
    pub fn new(name: impl Into<String>, help: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            handler,
        }
    }
}

impl<F> Builtin for FnBuiltin<F>
where
    F: Fn(&CommandContext) -> Object + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn help(&self) -> &str {
        &self.help
    }

    fn execute(&self, ctx: &CommandContext) -> Object {
        (self.handler)(ctx)
    }
}
