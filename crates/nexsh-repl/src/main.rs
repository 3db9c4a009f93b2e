//! nexsh CLI entry point.
//!
//! Usage:
//!   nexsh                      # Interactive REPL
//!   nexsh --config <path>      # REPL with a config file
//!   nexsh -c <command>         # Execute one command and exit

use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nexsh_kernel::{Kernel, KernelConfig};
use nexsh_repl::format::{self, Rendered};

fn main() -> ExitCode {
    // Respects RUST_LOG.
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();
    let mut config = KernelConfig::new();
    let mut command: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(ExitCode::SUCCESS);
            }
            "--version" | "-V" => {
                println!("nexsh {}", env!("CARGO_PKG_VERSION"));
                return Ok(ExitCode::SUCCESS);
            }
            "--config" => {
                let path = args
                    .get(i + 1)
                    .context("--config requires a file argument")?;
                config = KernelConfig::from_file(path)?;
                i += 2;
            }
            "-c" => {
                let cmd = args.get(i + 1).context("-c requires a command argument")?;
                command = Some(cmd.clone());
                i += 2;
            }
            arg if arg.starts_with("--config=") => {
                config = KernelConfig::from_file(&arg["--config=".len()..])?;
                i += 1;
            }
            unknown => {
                eprintln!("unknown option: {unknown}");
                eprintln!("Run 'nexsh --help' for usage.");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    if let Some(cmd) = command {
        return run_command(config, &cmd);
    }

    nexsh_repl::run(config)?;
    Ok(ExitCode::SUCCESS)
}

/// Execute one command, print its result, exit non-zero on error.
fn run_command(config: KernelConfig, cmd: &str) -> Result<ExitCode> {
    let kernel = Kernel::new(config).context("failed to initialize kernel")?;
    let result = kernel.execute_command(cmd);
    let failed = result.is_error();

    match format::render(&result) {
        Rendered::Out(text) => println!("{text}"),
        Rendered::Err(text) => eprintln!("{text}"),
        Rendered::Silent => {}
    }

    kernel.shutdown();
    if failed {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_help() {
    println!(
        r#"nexsh v{}

Usage:
  nexsh                        Interactive REPL
  nexsh --config <path>        REPL with a JSON config file
  nexsh -c <command>           Execute command string and exit

Options:
  -c <command>                 Execute command string and exit
  --config <path>              Load kernel configuration from a file
  -h, --help                   Show this help
  -V, --version                Show version

Examples:
  nexsh                        # Start interactive REPL
  nexsh -c 'ls -a /tmp'        # Run one command
  nexsh --config nexsh.json    # REPL with custom limits
"#,
        env!("CARGO_PKG_VERSION")
    );
}
