//! Command execution: builtin dispatch, external fallback, pipelines.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use nexsh_types::Object;
use tracing::{debug, warn};

use crate::bridge::HostServices;
use crate::gate::PermissionGate;
use crate::parser::{self, CommandParser, ParsedCommand};
use crate::pool::{PoolError, TaskHandle, WorkerPool};
use crate::tools::{register_builtins, BuiltinRegistry, CommandContext};

/// Default cap on the compiled pipeline cache.
const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// A pipeline whose stages have already been tokenized. Cached by full
/// pipeline text so repeated invocations skip the tokenizer.
pub struct CompiledPipeline {
    pub source: String,
    pub stages: Vec<ParsedCommand>,
}

struct PipelineCache {
    map: HashMap<String, Arc<CompiledPipeline>>,
    capacity: usize,
}

struct EngineInner {
    registry: Arc<BuiltinRegistry>,
    parser: Arc<CommandParser>,
    pool: Arc<WorkerPool>,
    gate: Arc<PermissionGate>,
    host: Arc<HostServices>,
    cache: Mutex<PipelineCache>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

/// The execution engine. Cheap to clone; all clones share the registry,
/// the pipeline cache, and the worker pool.
#[derive(Clone)]
pub struct ExecutionEngine {
    inner: Arc<EngineInner>,
}

impl ExecutionEngine {
    /// Build an engine with the stock builtins registered.
    pub fn new(
        parser: Arc<CommandParser>,
        pool: Arc<WorkerPool>,
        gate: Arc<PermissionGate>,
        host: Arc<HostServices>,
    ) -> Self {
        let registry = Arc::new(BuiltinRegistry::new());
        register_builtins(&registry);
        Self {
            inner: Arc::new(EngineInner {
                registry,
                parser,
                pool,
                gate,
                host,
                cache: Mutex::new(PipelineCache {
                    map: HashMap::new(),
                    capacity: DEFAULT_CACHE_CAPACITY,
                }),
                cache_hits: AtomicU64::new(0),
                cache_misses: AtomicU64::new(0),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<BuiltinRegistry> {
        &self.inner.registry
    }

    /// Execute one traditional command on the calling thread.
    ///
    /// Registered handlers win over external programs. A handler that
    /// panics is contained at this boundary and reported as an error
    /// object; the engine itself keeps running.
    #[tracing::instrument(level = "debug", skip(self, cmd), fields(command = %cmd.name))]
    pub fn execute_single(&self, cmd: &ParsedCommand) -> Object {
        if cmd.name.is_empty() {
            return Object::null();
        }

        if let Some(builtin) = self.inner.registry.get(&cmd.name) {
            let ctx =
                CommandContext::from_parsed(cmd, self.inner.gate.clone(), self.inner.host.clone());
            return match catch_unwind(AssertUnwindSafe(|| builtin.execute(&ctx))) {
                Ok(result) => result,
                Err(payload) => {
                    let detail = panic_message(payload.as_ref());
                    warn!(command = %cmd.name, %detail, "handler panicked");
                    Object::error(format!("{}: command failed: {detail}", cmd.name))
                }
            };
        }

        self.run_external(cmd)
    }

    /// Execute a pipeline given as raw stage strings. Each stage is
    /// tokenized and run independently, left to right; only the final
    /// stage's result is returned. An empty stage list yields null.
    pub fn execute_stages(&self, stages: &[String]) -> Object {
        let mut last = Object::null();
        for stage in stages {
            let cmd = self.inner.parser.parse_single(stage.trim());
            last = self.execute_single(&cmd);
        }
        last
    }

    /// Execute a pipeline by its full text, going through the compiled
    /// cache.
    pub fn execute_pipeline(&self, pipeline: &str) -> Object {
        let compiled = self.compile_pipeline(pipeline);
        let mut last = Object::null();
        for stage in &compiled.stages {
            last = self.execute_single(stage);
        }
        last
    }

    /// Run one command on the worker pool. The handle resolves to the
    /// command's result object.
    pub fn execute_async(&self, cmd: ParsedCommand) -> Result<TaskHandle<Object>, PoolError> {
        let engine = self.clone();
        self.inner.pool.submit(move || engine.execute_single(&cmd))
    }

    /// Run a full pipeline on the worker pool.
    pub fn execute_pipeline_async(
        &self,
        pipeline: String,
    ) -> Result<TaskHandle<Object>, PoolError> {
        let engine = self.clone();
        self.inner
            .pool
            .submit(move || engine.execute_pipeline(&pipeline))
    }

    /// Tokenize a pipeline's stages, consulting the cache first. Once
    /// the cache is at capacity new pipelines are compiled but not
    /// retained; cached entries are never evicted.
    pub fn compile_pipeline(&self, pipeline: &str) -> Arc<CompiledPipeline> {
        let key = pipeline.trim();
        {
            let cache = self.inner.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(compiled) = cache.map.get(key) {
                self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
                return compiled.clone();
            }
        }
        self.inner.cache_misses.fetch_add(1, Ordering::Relaxed);

        let stages: Vec<ParsedCommand> = parser::split_pipeline(key)
            .iter()
            .map(|s| self.inner.parser.parse_single(s))
            .collect();
        let compiled = Arc::new(CompiledPipeline {
            source: key.to_string(),
            stages,
        });

        let mut cache = self.inner.cache.lock().unwrap_or_else(|e| e.into_inner());
        if cache.map.len() < cache.capacity {
            cache.map.insert(key.to_string(), compiled.clone());
        } else {
            debug!(pipeline = %key, "pipeline cache at capacity, not retaining");
        }
        compiled
    }

    pub fn clear_compiled_cache(&self) {
        let mut cache = self.inner.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.map.clear();
    }

    pub fn set_pipeline_cache_size(&self, capacity: usize) {
        let mut cache = self.inner.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.capacity = capacity;
        // Shrinking the cap does not drop existing entries; they simply
        // stop being joined by new ones.
    }

    /// (hits, misses) counters for the pipeline cache.
    pub fn cache_stats(&self) -> (u64, u64) {
        (
            self.inner.cache_hits.load(Ordering::Relaxed),
            self.inner.cache_misses.load(Ordering::Relaxed),
        )
    }

    /// Fallback for names with no registered handler: spawn the command
    /// as an external process and capture its stdout.
    fn run_external(&self, cmd: &ParsedCommand) -> Object {
        if !self.inner.gate.check_permission("proc:exec", &cmd.name) {
            return Object::error(format!("{}: permission denied", cmd.name));
        }

        let mut body = cmd.raw.as_str();
        if body.ends_with('&') {
            body = body[..body.len() - 1].trim_end();
        }
        let argv = parser::argv(body);
        let Some((program, rest)) = argv.split_first() else {
            return Object::null();
        };

        debug!(command = %program, "running external process");
        match std::process::Command::new(program).args(rest).output() {
            Ok(output) => {
                if output.status.success() {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    Object::text(stdout.trim_end_matches('\n').to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Object::error(format!(
                        "{program}: exited with {}: {}",
                        output.status,
                        stderr.trim_end()
                    ))
                }
            }
            Err(_) => Object::error(format!("{program}: command not found")),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::MemoryBudget;
    use nexsh_types::TypeTag;

    fn engine() -> ExecutionEngine {
        let gate = Arc::new(PermissionGate::new());
        let budget = Arc::new(MemoryBudget::new(64 * 1024 * 1024));
        let host = Arc::new(HostServices::new(gate.clone(), budget));
        let parser = Arc::new(CommandParser::new());
        let pool = Arc::new(WorkerPool::new(2));
        ExecutionEngine::new(parser, pool, gate, host)
    }

    #[test]
    fn builtin_wins_over_external() {
        let engine = engine();
        let cmd = engine.inner.parser.parse_single("pwd");
        let result = engine.execute_single(&cmd);
        assert_eq!(result.meta.tag, TypeTag::Text);
    }

    #[test]
    fn registered_handler_shadows_builtin() {
        let engine = engine();
        engine
            .registry()
            .register_fn("pwd", "override", |_| Object::text("shadowed"));
        let cmd = engine.inner.parser.parse_single("pwd");
        assert_eq!(engine.execute_single(&cmd).value.as_text().unwrap(), "shadowed");
    }

    #[test]
    fn panicking_handler_becomes_error_object() {
        let engine = engine();
        engine
            .registry()
            .register_fn("boom", "", |_| panic!("kaboom"));
        let cmd = engine.inner.parser.parse_single("boom");
        let result = engine.execute_single(&cmd);
        assert!(result.is_error());
        assert!(result.error_message().unwrap().contains("kaboom"));

        // The engine still works afterwards.
        let cmd = engine.inner.parser.parse_single("pwd");
        assert!(!engine.execute_single(&cmd).is_error());
    }

    #[test]
    fn unknown_command_reports_not_found() {
        let engine = engine();
        let cmd = engine
            .inner
            .parser
            .parse_single("definitely-not-a-real-command-xyz");
        let result = engine.execute_single(&cmd);
        assert!(result.is_error());
        assert!(result.error_message().unwrap().contains("not found"));
    }

    #[test]
    fn pipeline_returns_last_stage_only() {
        let engine = engine();
        engine
            .registry()
            .register_fn("first", "", |_| Object::text("one"));
        engine
            .registry()
            .register_fn("second", "", |_| Object::text("two"));
        let result = engine.execute_stages(&["first".into(), "second".into()]);
        assert_eq!(result.value.as_text().unwrap(), "two");
    }

    #[test]
    fn empty_pipeline_is_null() {
        let engine = engine();
        let result = engine.execute_stages(&[]);
        assert_eq!(result.meta.tag, TypeTag::Null);
    }

    #[test]
    fn compile_cache_hits_on_repeat() {
        let engine = engine();
        let a = engine.compile_pipeline("pwd | pwd");
        let b = engine.compile_pipeline("pwd | pwd");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(engine.cache_stats(), (1, 1));
        assert_eq!(a.stages.len(), 2);
    }

    #[test]
    fn cache_at_capacity_compiles_without_retaining() {
        let engine = engine();
        engine.set_pipeline_cache_size(1);
        engine.compile_pipeline("pwd | pwd");
        let first = engine.compile_pipeline("help | help");
        let second = engine.compile_pipeline("help | help");
        // Both compiled fresh: the cache never held the second pipeline.
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(engine.cache_stats().0, 0);
    }

    #[test]
    fn clear_cache_forces_recompile() {
        let engine = engine();
        let a = engine.compile_pipeline("pwd | pwd");
        engine.clear_compiled_cache();
        let b = engine.compile_pipeline("pwd | pwd");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn async_execution_delivers_result() {
        let engine = engine();
        engine
            .registry()
            .register_fn("answer", "", |_| Object::text("42"));
        let cmd = engine.inner.parser.parse_single("answer");
        let handle = engine.execute_async(cmd).unwrap();
        assert_eq!(handle.wait().unwrap().value.as_text().unwrap(), "42");
    }
}
