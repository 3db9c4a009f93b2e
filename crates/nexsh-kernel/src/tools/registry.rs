use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use nexsh_types::Object;

use super::context::CommandContext;
use super::traits::{Builtin, FnBuiltin};

/// Name-keyed store of builtin handlers. Registration is last-wins so
/// embedders can shadow stock commands with their own.
pub struct BuiltinRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn Builtin>>>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, builtin: Arc<dyn Builtin>) {
        let name = builtin.name().to_string();
        let mut handlers = self.handlers.write().expect("registry lock poisoned");
        if handlers.insert(name.clone(), builtin).is_some() {
            tracing::debug!(command = %name, "replaced existing handler");
        }
    }

    pub fn register_fn<F>(&self, name: &str, help: &str, handler: F)
    where
        F: Fn(&CommandContext) -> Object + Send + Sync + 'static,
    {
        self.register(Arc::new(FnBuiltin::new(name, help, handler)));
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.handlers
            .write()
            .expect("registry lock poisoned")
            .remove(name)
            .is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Builtin>> {
        self.handlers
            .read()
            .expect("registry lock poisoned")
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers
            .read()
            .expect("registry lock poisoned")
            .contains_key(name)
    }

    /// Registered names, sorted, for `help` output and completion.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .expect("registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn help_for(&self, name: &str) -> Option<String> {
        self.get(name).map(|b| b.help().to_string())
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexsh_types::Object;

    #[test]
    fn last_registration_wins() {
        let registry = BuiltinRegistry::new();
        registry.register_fn("greet", "first", |_| Object::text("one"));
        registry.register_fn("greet", "second", |_| Object::text("two"));

        let ctx = CommandContext::for_test(vec![]);
        let result = registry.get("greet").unwrap().execute(&ctx);
        assert_eq!(result.value.as_text().unwrap(), "two");
        assert_eq!(registry.help_for("greet").unwrap(), "second");
    }

    #[test]
    fn unregister_removes_handler() {
        let registry = BuiltinRegistry::new();
        registry.register_fn("temp", "", |_| Object::null());
        assert!(registry.unregister("temp"));
        assert!(!registry.unregister("temp"));
        assert!(registry.get("temp").is_none());
    }

    #[test]
    fn names_are_sorted() {
        let registry = BuiltinRegistry::new();
        registry.register_fn("zeta", "", |_| Object::null());
        registry.register_fn("alpha", "", |_| Object::null());
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }
}
