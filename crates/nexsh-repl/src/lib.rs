//! Interactive shell over the nexsh kernel.
//!
//! The loop is deliberately thin: rustyline owns line editing and
//! history, the kernel owns everything else. The only inputs handled
//! locally are `clear` (terminal control, not a command) and the
//! exit-tagged result objects that tell the loop to stop.

pub mod format;

use std::path::PathBuf;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use nexsh_kernel::{Kernel, KernelConfig};

use crate::format::Rendered;

/// What the loop should do after a line.
#[derive(Debug, PartialEq, Eq)]
enum LineOutcome {
    Continue,
    Exit,
}

pub struct Repl {
    kernel: Kernel,
}

impl Repl {
    pub fn new() -> Result<Self> {
        Self::with_config(KernelConfig::new())
    }

    pub fn with_config(config: KernelConfig) -> Result<Self> {
        let kernel = Kernel::new(config).context("failed to initialize kernel")?;
        Ok(Self { kernel })
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Process one line: route it through the kernel, print the result,
    /// and report whether the loop should keep going.
    fn process_line(&self, line: &str) -> LineOutcome {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return LineOutcome::Continue;
        }

        // Terminal control, not a kernel command.
        if trimmed == "clear" {
            print!("\x1b[2J\x1b[H");
            return LineOutcome::Continue;
        }

        if trimmed == "quit" {
            return LineOutcome::Exit;
        }

        let result = self.kernel.execute_command(trimmed);
        match format::render(&result) {
            Rendered::Out(text) => println!("{text}"),
            Rendered::Err(text) => eprintln!("{text}"),
            Rendered::Silent => {}
        }

        if result.is_exit() {
            return LineOutcome::Exit;
        }
        LineOutcome::Continue
    }
}

fn history_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.data_dir().join("nexsh").join("history.txt"))
}

fn save_history(rl: &mut Editor<(), DefaultHistory>, path: &Option<PathBuf>) {
    if let Some(path) = path {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("failed to create history directory: {e}");
            }
        }
        if let Err(e) = rl.save_history(path) {
            tracing::warn!("failed to save history: {e}");
        }
    }
}

/// Run the interactive loop until the user exits.
pub fn run(config: KernelConfig) -> Result<()> {
    println!("nexsh v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for commands, 'exit' to quit.");
    println!();

    let mut rl: Editor<(), DefaultHistory> =
        Editor::new().context("failed to create line editor")?;

    let history = history_path();
    if let Some(ref path) = history {
        if let Err(e) = rl.load_history(path) {
            let not_found = matches!(&e, ReadlineError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound);
            if !not_found {
                tracing::warn!("failed to load history: {e}");
            }
        }
    }

    let repl = Repl::with_config(config)?;

    loop {
        match rl.readline("nexsh> ") {
            Ok(line) => {
                if let Err(e) = rl.add_history_entry(line.as_str()) {
                    tracing::warn!("failed to add history entry: {e}");
                }
                if repl.process_line(&line) == LineOutcome::Exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(e) => {
                eprintln!("error: {e}");
                break;
            }
        }
    }

    save_history(&mut rl, &history);
    repl.kernel.shutdown();
    Ok(())
}
