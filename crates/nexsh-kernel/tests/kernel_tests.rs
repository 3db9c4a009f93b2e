//! End-to-end kernel tests: routing, transactions, gating, metrics.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use nexsh_kernel::bridge::{ForeignValue, HostServices, ScriptEngine, ScriptError};
use nexsh_kernel::{Kernel, KernelConfig};
use nexsh_types::{Object, TypeTag};

fn kernel() -> Kernel {
    let mut config = KernelConfig::new();
    config.set("thread_pool_size", "2");
    Kernel::new(config).unwrap()
}

/// Test double that records the payloads it receives and answers with a
/// fixed number.
struct RecordingEngine {
    payloads: std::sync::Mutex<Vec<String>>,
}

impl ScriptEngine for RecordingEngine {
    fn eval(&self, source: &str, _host: &HostServices) -> Result<ForeignValue, ScriptError> {
        self.payloads.lock().unwrap().push(source.to_string());
        Ok(ForeignValue::Number(42.0))
    }
}

#[test]
fn traditional_command_produces_text() {
    let kernel = kernel();
    let result = kernel.execute_command("pwd");
    assert_eq!(result.meta.tag, TypeTag::Text);
}

#[test]
fn mutating_builtins_report_success_as_text() {
    let kernel = kernel();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("made");

    let result = kernel.execute_command(&format!("mkdir {}", target.display()));
    assert_eq!(result.meta.tag, TypeTag::Text);
    assert!(target.is_dir());

    let result = kernel.execute_command(&format!("rm {}", target.display()));
    assert_eq!(result.meta.tag, TypeTag::Text);
    assert!(!target.exists());
}

#[test]
fn pipeline_returns_final_stage_result() {
    let kernel = kernel();
    kernel
        .engine()
        .registry()
        .register_fn("first", "", |_| Object::text("one"));
    kernel
        .engine()
        .registry()
        .register_fn("second", "", |_| Object::text("two"));

    let result = kernel.execute_command("first | second");
    assert_eq!(result.value.as_text().unwrap(), "two");
}

#[test]
fn script_payload_reaches_engine_verbatim() {
    let engine = Arc::new(RecordingEngine {
        payloads: std::sync::Mutex::new(Vec::new()),
    });
    let mut config = KernelConfig::new();
    config.set("thread_pool_size", "2");
    let kernel = Kernel::with_script_engine(config, engine.clone()).unwrap();

    let input = "nexus.fs.readFile('/etc/hosts')";
    let result = kernel.execute_command(input);
    // Integral foreign numbers come back as integers.
    assert_eq!(result.meta.tag, TypeTag::Int);
    assert_eq!(engine.payloads.lock().unwrap().as_slice(), [input]);
}

#[test]
fn script_with_no_engine_is_a_script_error() {
    let kernel = kernel();
    let result = kernel.execute_command("let x = 5");
    assert!(result.is_error());
    assert!(result
        .error_message()
        .unwrap()
        .starts_with("script error:"));
}

#[test]
fn two_transactions_are_independent() {
    let kernel = kernel();
    let tx_a = kernel.begin_transaction();
    let tx_b = kernel.begin_transaction();
    assert_ne!(tx_a, tx_b);

    let runs = Arc::new(AtomicU32::new(0));
    let counter = runs.clone();
    kernel.set_rollback(tx_a, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // Rolling back A runs its action exactly once and leaves B alone.
    assert!(kernel.rollback_transaction(tx_a));
    assert!(!kernel.rollback_transaction(tx_a));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(kernel.commit_transaction(tx_b));
}

#[test]
fn denied_execution_errors_with_input_and_counts() {
    let kernel = kernel();
    kernel.gate().deny_resource("command:execute", "rm -rf /");

    let before = kernel.metrics().commands_executed;
    let result = kernel.execute_command("rm -rf /");
    assert!(result.is_error());
    assert!(result.error_message().unwrap().contains("rm -rf /"));
    assert_eq!(kernel.metrics().commands_executed, before + 1);

    // The denial is on the audit trail.
    assert!(kernel
        .gate()
        .audit_log()
        .iter()
        .any(|line| line.starts_with("DENY")));
}

#[test]
fn config_defaults_and_overrides() {
    let config = KernelConfig::new();
    assert_eq!(config.max_memory(), 52_428_800);
    assert_eq!(config.thread_pool_size(), 8);

    let kernel = kernel();
    kernel.config_set("history_size", "500");
    assert_eq!(kernel.config_get("history_size").as_deref(), Some("500"));
    assert_eq!(kernel.config_get("missing"), None);
}

#[test]
fn pipeline_cache_reports_hits_through_metrics() {
    let kernel = kernel();
    kernel.execute_command("pwd | pwd");
    kernel.execute_command("pwd | pwd");
    let metrics = kernel.metrics();
    assert_eq!(metrics.cache_misses, 1);
    assert_eq!(metrics.cache_hits, 1);
}

#[test]
fn background_command_acknowledges_immediately() {
    let kernel = kernel();
    let result = kernel.execute_command("pwd &");
    assert_eq!(result.meta.tag, TypeTag::Text);
    assert!(result.value.as_text().unwrap().contains("pwd"));
}
