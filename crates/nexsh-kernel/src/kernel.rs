//! Kernel orchestration: configuration, lifecycle, routing, metrics,
//! and transactions.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::Context;
use nexsh_types::{next_object_id, Object};
use tracing::{debug, info, warn};

use crate::bridge::{foreign_to_object, HostServices, ScriptEngine, UnavailableEngine};
use crate::budget::MemoryBudget;
use crate::engine::ExecutionEngine;
use crate::gate::PermissionGate;
use crate::parser::{CommandParser, ParsedInput};
use crate::pool::WorkerPool;

const DEFAULT_MAX_MEMORY: u64 = 52_428_800;
const DEFAULT_THREAD_POOL_SIZE: usize = 8;

/// Startup configuration. A flat string map; the two keys the kernel
/// itself consumes are `max_memory` (bytes) and `thread_pool_size`.
/// Unknown keys are retained and visible through the config accessors.
#[derive(Debug, Clone, Default)]
pub struct KernelConfig {
    values: HashMap<String, String>,
}

impl KernelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a flat JSON object. Non-string scalar values are
    /// coerced to their text form.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let parsed: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        let mut values = HashMap::new();
        for (key, value) in parsed {
            let text = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            values.insert(key, text);
        }
        Ok(Self { values })
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn max_memory(&self) -> u64 {
        self.parsed_or("max_memory", DEFAULT_MAX_MEMORY)
    }

    pub fn thread_pool_size(&self) -> usize {
        self.parsed_or("thread_pool_size", DEFAULT_THREAD_POOL_SIZE)
    }

    fn parsed_or<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        match self.values.get(key) {
            Some(raw) => match raw.parse() {
                Ok(v) => v,
                Err(_) => {
                    warn!(key, value = %raw, "unparseable config value, using default");
                    default
                }
            },
            None => default,
        }
    }
}

/// Counters the kernel keeps per instance. `memory_in_use`, the cache
/// counters, `average_execution_micros`, and `cpu_usage_percent` are
/// derived at snapshot time.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct PerformanceMetrics {
    pub commands_executed: u64,
    pub total_execution_micros: u64,
    pub average_execution_micros: u64,
    pub memory_in_use: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Best-effort: share of wall-clock time since startup (or the last
    /// reset) spent executing commands, capped at 100.
    pub cpu_usage_percent: f64,
}

struct Transaction {
    commands: Vec<String>,
    results: Vec<Object>,
    rollback: Option<Box<dyn FnOnce() + Send>>,
}

/// The shell kernel: owns every subsystem and is the single entry
/// point hosting loops call into.
pub struct Kernel {
    config: Mutex<HashMap<String, String>>,
    budget: Arc<MemoryBudget>,
    pool: Arc<WorkerPool>,
    gate: Arc<PermissionGate>,
    host: Arc<HostServices>,
    script_engine: Arc<dyn ScriptEngine>,
    parser: Arc<CommandParser>,
    engine: ExecutionEngine,
    metrics: Mutex<PerformanceMetrics>,
    metrics_epoch: Mutex<Instant>,
    transactions: Mutex<HashMap<u64, Transaction>>,
    running: AtomicBool,
}

impl Kernel {
    /// Bring the kernel up with no embedded scripting engine. Script
    /// input still classifies and routes; evaluation reports that no
    /// engine is configured.
    pub fn new(config: KernelConfig) -> anyhow::Result<Self> {
        Self::with_script_engine(config, Arc::new(UnavailableEngine))
    }

    /// Bring the kernel up, wiring subsystems in dependency order:
    /// budget, pool, gate, bridge, parser, engine.
    pub fn with_script_engine(
        config: KernelConfig,
        script_engine: Arc<dyn ScriptEngine>,
    ) -> anyhow::Result<Self> {
        let max_memory = config.max_memory();
        let pool_size = config.thread_pool_size();
        anyhow::ensure!(max_memory > 0, "max_memory must be positive");
        anyhow::ensure!(pool_size > 0, "thread_pool_size must be positive");

        let budget = Arc::new(MemoryBudget::new(max_memory));
        let pool = Arc::new(WorkerPool::new(pool_size));
        let gate = Arc::new(PermissionGate::new());
        let host = Arc::new(HostServices::new(gate.clone(), budget.clone()));
        let parser = Arc::new(CommandParser::new());
        let engine = ExecutionEngine::new(parser.clone(), pool.clone(), gate.clone(), host.clone());

        info!(max_memory, pool_size, "kernel initialized");
        Ok(Self {
            config: Mutex::new(config.values),
            budget,
            pool,
            gate,
            host,
            script_engine,
            parser,
            engine,
            metrics: Mutex::new(PerformanceMetrics::default()),
            metrics_epoch: Mutex::new(Instant::now()),
            transactions: Mutex::new(HashMap::new()),
            running: AtomicBool::new(true),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Tear down in reverse initialization order. Idempotent.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("kernel shutting down");
            self.engine.clear_compiled_cache();
            self.pool.shutdown();
        }
    }

    /// Execute one line of input: classify, gate, route, and record
    /// metrics. Every outcome is an [`Object`]; this never panics and
    /// never returns early without accounting for the attempt.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn execute_command(&self, input: &str) -> Object {
        let started = Instant::now();

        if !self.is_running() {
            let result = Object::error("kernel is not running");
            self.record(started);
            return result;
        }

        if !self.gate.check_permission("command:execute", input) {
            // Denied attempts still count: the caller asked, the kernel
            // answered.
            let result = Object::error(format!("permission denied: {input}"));
            self.record(started);
            return result;
        }

        let result = match catch_unwind(AssertUnwindSafe(|| self.route(input))) {
            Ok(result) => result,
            Err(_) => {
                warn!(%input, "execution panicked past the engine boundary");
                Object::error("internal error: command execution panicked")
            }
        };

        self.record(started);
        result
    }

    fn route(&self, input: &str) -> Object {
        match self.parser.parse(input) {
            ParsedInput::Empty => Object::null(),
            ParsedInput::Script { payload, .. } => {
                debug!("routing input to script engine");
                match self.script_engine.eval(&payload, &self.host) {
                    Ok(value) => foreign_to_object(value),
                    Err(e) => Object::error(format!("script error: {e}")),
                }
            }
            ParsedInput::Pipeline(_) => self.engine.execute_pipeline(input),
            ParsedInput::Command(cmd) => {
                if cmd.background {
                    let name = cmd.name.clone();
                    return match self.engine.execute_async(cmd) {
                        Ok(_handle) => Object::text(format!("[background] {name}")),
                        Err(e) => Object::error(format!("{name}: {e}")),
                    };
                }
                self.engine.execute_single(&cmd)
            }
        }
    }

    fn record(&self, started: Instant) {
        let elapsed = started.elapsed().as_micros() as u64;
        let mut metrics = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        metrics.commands_executed += 1;
        metrics.total_execution_micros += elapsed;
    }

    /// Snapshot the counters, folding in budget usage and pipeline
    /// cache statistics.
    pub fn metrics(&self) -> PerformanceMetrics {
        let mut snapshot = self
            .metrics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        snapshot.memory_in_use = self.budget.used();
        let (hits, misses) = self.engine.cache_stats();
        snapshot.cache_hits = hits;
        snapshot.cache_misses = misses;
        if snapshot.commands_executed > 0 {
            snapshot.average_execution_micros =
                snapshot.total_execution_micros / snapshot.commands_executed;
        }
        let elapsed = {
            let epoch = self.metrics_epoch.lock().unwrap_or_else(|e| e.into_inner());
            epoch.elapsed().as_micros() as u64
        };
        if elapsed > 0 {
            // Can exceed 100 with concurrent background work; cap it.
            snapshot.cpu_usage_percent =
                (snapshot.total_execution_micros as f64 / elapsed as f64 * 100.0).min(100.0);
        }
        snapshot
    }

    pub fn reset_metrics(&self) {
        let mut metrics = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        *metrics = PerformanceMetrics::default();
        let mut epoch = self.metrics_epoch.lock().unwrap_or_else(|e| e.into_inner());
        *epoch = Instant::now();
    }

    /// Open a transaction and return its id. Ids come from the same
    /// monotonic source as object ids, so they are unique per process.
    pub fn begin_transaction(&self) -> u64 {
        let id = next_object_id();
        let mut txs = self.transactions.lock().unwrap_or_else(|e| e.into_inner());
        txs.insert(
            id,
            Transaction {
                commands: Vec::new(),
                results: Vec::new(),
                rollback: None,
            },
        );
        debug!(tx = id, "transaction opened");
        id
    }

    /// Attach the compensating action to run if the transaction rolls
    /// back. Replaces any previously attached action.
    pub fn set_rollback(&self, tx: u64, action: impl FnOnce() + Send + 'static) -> bool {
        let mut txs = self.transactions.lock().unwrap_or_else(|e| e.into_inner());
        match txs.get_mut(&tx) {
            Some(entry) => {
                entry.rollback = Some(Box::new(action));
                true
            }
            None => false,
        }
    }

    /// Execute a command under a transaction, recording the command and
    /// a snapshot of its result in the transaction log. Unknown (or
    /// already-finalized) transaction ids fail without executing
    /// anything.
    pub fn execute_command_in(&self, tx: u64, input: &str) -> Object {
        {
            let mut txs = self.transactions.lock().unwrap_or_else(|e| e.into_inner());
            match txs.get_mut(&tx) {
                Some(entry) => entry.commands.push(input.to_string()),
                None => return Object::error(format!("unknown transaction: {tx}")),
            }
        }
        let result = self.execute_command(input);
        let mut txs = self.transactions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = txs.get_mut(&tx) {
            entry.results.push(result.clone());
        }
        result
    }

    /// Close a transaction successfully and discard its state. The
    /// rollback action, if any, is dropped unrun. Returns false for
    /// unknown or already-finalized transactions.
    pub fn commit_transaction(&self, tx: u64) -> bool {
        let mut txs = self.transactions.lock().unwrap_or_else(|e| e.into_inner());
        match txs.remove(&tx) {
            Some(_) => {
                debug!(tx, "transaction committed");
                true
            }
            None => false,
        }
    }

    /// Abort a transaction, running its rollback action exactly once,
    /// then discard its state. A second rollback, or a rollback of an
    /// unknown id, is a no-op returning false.
    pub fn rollback_transaction(&self, tx: u64) -> bool {
        let action = {
            let mut txs = self.transactions.lock().unwrap_or_else(|e| e.into_inner());
            match txs.remove(&tx) {
                Some(entry) => entry.rollback,
                None => return false,
            }
        };
        // Run outside the lock so the action can touch the kernel.
        if let Some(action) = action {
            action();
        }
        debug!(tx, "transaction rolled back");
        true
    }

    /// Command log of a transaction, while it is still open. Finalized
    /// transactions are gone.
    pub fn transaction_commands(&self, tx: u64) -> Option<Vec<String>> {
        let txs = self.transactions.lock().unwrap_or_else(|e| e.into_inner());
        txs.get(&tx).map(|entry| entry.commands.clone())
    }

    /// Result snapshots of an open transaction's commands, in execution
    /// order.
    pub fn transaction_results(&self, tx: u64) -> Option<Vec<Object>> {
        let txs = self.transactions.lock().unwrap_or_else(|e| e.into_inner());
        txs.get(&tx).map(|entry| entry.results.clone())
    }

    pub fn config_get(&self, key: &str) -> Option<String> {
        let config = self.config.lock().unwrap_or_else(|e| e.into_inner());
        config.get(key).cloned()
    }

    pub fn config_set(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut config = self.config.lock().unwrap_or_else(|e| e.into_inner());
        config.insert(key.into(), value.into());
    }

    pub fn gate(&self) -> &Arc<PermissionGate> {
        &self.gate
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn parser(&self) -> &Arc<CommandParser> {
        &self.parser
    }

    pub fn budget(&self) -> &Arc<MemoryBudget> {
        &self.budget
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexsh_types::TypeTag;

    fn kernel() -> Kernel {
        let mut config = KernelConfig::new();
        config.set("thread_pool_size", "2");
        Kernel::new(config).unwrap()
    }

    #[test]
    fn config_defaults() {
        let config = KernelConfig::new();
        assert_eq!(config.max_memory(), 52_428_800);
        assert_eq!(config.thread_pool_size(), 8);
    }

    #[test]
    fn config_from_file_coerces_scalars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"max_memory": 1048576, "thread_pool_size": 2, "prompt": "nx> "}"#,
        )
        .unwrap();

        let config = KernelConfig::from_file(&path).unwrap();
        assert_eq!(config.max_memory(), 1_048_576);
        assert_eq!(config.thread_pool_size(), 2);
        assert_eq!(config.get("prompt"), Some("nx> "));
    }

    #[test]
    fn config_bad_file_is_an_error() {
        assert!(KernelConfig::from_file("/no/such/config.json").is_err());
    }

    #[test]
    fn empty_input_is_null_and_counted() {
        let kernel = kernel();
        let result = kernel.execute_command("   ");
        assert_eq!(result.meta.tag, TypeTag::Null);
        assert_eq!(kernel.metrics().commands_executed, 1);
    }

    #[test]
    fn builtin_command_round_trip() {
        let kernel = kernel();
        let result = kernel.execute_command("pwd");
        assert_eq!(result.meta.tag, TypeTag::Text);
        assert!(!result.value.as_text().unwrap().is_empty());
    }

    #[test]
    fn script_without_engine_reports_script_error() {
        let kernel = kernel();
        let result = kernel.execute_command("nexus.fs.readFile('/tmp/x')");
        assert!(result.is_error());
        assert!(result.error_message().unwrap().starts_with("script error:"));
    }

    #[test]
    fn denied_command_errors_and_still_counts() {
        let kernel = kernel();
        kernel.gate().deny_resource("command:execute", "pwd");
        let result = kernel.execute_command("pwd");
        assert!(result.is_error());
        assert!(result.error_message().unwrap().contains("pwd"));
        assert_eq!(kernel.metrics().commands_executed, 1);
    }

    #[test]
    fn shutdown_is_idempotent_and_stops_execution() {
        let kernel = kernel();
        kernel.shutdown();
        kernel.shutdown();
        assert!(!kernel.is_running());
        let result = kernel.execute_command("pwd");
        assert!(result.is_error());
    }

    #[test]
    fn transactions_get_distinct_ids() {
        let kernel = kernel();
        let a = kernel.begin_transaction();
        let b = kernel.begin_transaction();
        assert_ne!(a, b);
    }

    #[test]
    fn rollback_runs_exactly_once() {
        use std::sync::atomic::AtomicU32;

        let kernel = kernel();
        let tx = kernel.begin_transaction();
        let runs = Arc::new(AtomicU32::new(0));
        let counter = runs.clone();
        assert!(kernel.set_rollback(tx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(kernel.rollback_transaction(tx));
        assert!(!kernel.rollback_transaction(tx));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn commit_discards_rollback() {
        use std::sync::atomic::AtomicU32;

        let kernel = kernel();
        let tx = kernel.begin_transaction();
        let runs = Arc::new(AtomicU32::new(0));
        let counter = runs.clone();
        kernel.set_rollback(tx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(kernel.commit_transaction(tx));
        assert!(!kernel.rollback_transaction(tx));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_transaction_is_a_no_op() {
        let kernel = kernel();
        assert!(!kernel.commit_transaction(999_999));
        assert!(!kernel.rollback_transaction(999_999));
        assert!(!kernel.set_rollback(999_999, || {}));
    }

    #[test]
    fn transactional_execution_logs_commands() {
        let kernel = kernel();
        let tx = kernel.begin_transaction();
        kernel.execute_command_in(tx, "pwd");
        kernel.execute_command_in(tx, "help pwd");
        assert_eq!(
            kernel.transaction_commands(tx).unwrap(),
            vec!["pwd".to_string(), "help pwd".to_string()]
        );
        let results = kernel.transaction_results(tx).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].meta.tag, TypeTag::Text);

        kernel.commit_transaction(tx);
        let result = kernel.execute_command_in(tx, "pwd");
        assert!(result.is_error());
    }

    #[test]
    fn finalized_transactions_are_discarded() {
        let kernel = kernel();

        let committed = kernel.begin_transaction();
        kernel.execute_command_in(committed, "pwd");
        assert!(kernel.commit_transaction(committed));
        assert!(kernel.transaction_commands(committed).is_none());
        assert!(kernel.transaction_results(committed).is_none());
        assert!(!kernel.commit_transaction(committed));

        let aborted = kernel.begin_transaction();
        assert!(kernel.rollback_transaction(aborted));
        assert!(kernel.transaction_commands(aborted).is_none());
    }

    #[test]
    fn metrics_average_and_reset() {
        let kernel = kernel();
        kernel.execute_command("pwd");
        kernel.execute_command("pwd");
        let metrics = kernel.metrics();
        assert_eq!(metrics.commands_executed, 2);
        assert!(metrics.average_execution_micros <= metrics.total_execution_micros);
        assert!((0.0..=100.0).contains(&metrics.cpu_usage_percent));

        kernel.reset_metrics();
        assert_eq!(kernel.metrics().commands_executed, 0);
    }

    #[test]
    fn runtime_config_overrides_are_visible() {
        let kernel = kernel();
        assert_eq!(kernel.config_get("prompt"), None);
        kernel.config_set("prompt", "nx> ");
        assert_eq!(kernel.config_get("prompt"), Some("nx> ".to_string()));
    }
}
