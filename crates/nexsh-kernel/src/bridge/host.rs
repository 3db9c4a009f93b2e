//! Host services — the `nexus` namespace method table the kernel exposes
//! to the scripting engine.
//!
//! Every call passes the permission gate with the target path or pid as
//! the resource, and file reads are charged against the memory budget
//! before buffering. The methods themselves are thin I/O wrappers; they
//! carry no policy of their own.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::UNIX_EPOCH;

use serde::Serialize;
use tracing::debug;

use crate::budget::MemoryBudget;
use crate::gate::PermissionGate;

use super::BridgeError;

/// One entry from `listDir`.
#[derive(Debug, Clone, Serialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(rename = "isFile")]
    pub is_file: bool,
    #[serde(rename = "isDirectory")]
    pub is_directory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Result of `stat`.
#[derive(Debug, Clone, Serialize)]
pub struct FileStat {
    pub path: String,
    pub size: u64,
    pub is_file: bool,
    pub is_directory: bool,
    /// Last modification, microseconds since epoch.
    pub modified_at: u64,
}

/// Result of `process.list` / `process.info`.
#[derive(Debug, Clone, Serialize)]
pub struct ProcInfo {
    pub pid: u32,
    pub command: String,
}

/// An active filesystem watch. Dropping the last handle releases the
/// registration.
#[derive(Debug)]
pub struct WatchRegistration {
    pub path: String,
}

/// The capability-scoped host the scripting engine calls back into.
pub struct HostServices {
    gate: Arc<PermissionGate>,
    budget: Arc<MemoryBudget>,
    watches: Mutex<Vec<Arc<WatchRegistration>>>,
}

impl HostServices {
    pub fn new(gate: Arc<PermissionGate>, budget: Arc<MemoryBudget>) -> Self {
        Self {
            gate,
            budget,
            watches: Mutex::new(Vec::new()),
        }
    }

    fn check(&self, capability: &str, resource: &str) -> Result<(), BridgeError> {
        if self.gate.check_permission(capability, resource) {
            Ok(())
        } else {
            Err(BridgeError::PermissionDenied {
                capability: capability.to_string(),
                resource: resource.to_string(),
            })
        }
    }

    // ── filesystem ──────────────────────────────────────────────────

    /// `nexus.fs.readFile(path) -> text`
    pub fn fs_read_file(&self, path: &str) -> Result<String, BridgeError> {
        self.check("fs:read", path)?;
        let len = fs::metadata(path)?.len();
        self.budget.try_reserve(len)?;
        let result = fs::read_to_string(path);
        self.budget.release(len);
        Ok(result?)
    }

    /// `nexus.fs.writeFile(path, text) -> boolean`
    pub fn fs_write_file(&self, path: &str, contents: &str) -> Result<bool, BridgeError> {
        self.check("fs:write", path)?;
        fs::write(path, contents)?;
        Ok(true)
    }

    /// `nexus.fs.listDir(path = ".") -> array of entries`
    pub fn fs_list_dir(&self, path: Option<&str>) -> Result<Vec<DirEntry>, BridgeError> {
        let path = path.unwrap_or(".");
        self.check("fs:list", path)?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_file: meta.is_file(),
                is_directory: meta.is_dir(),
                size: meta.is_file().then(|| meta.len()),
            });
        }
        Ok(entries)
    }

    /// `nexus.fs.stat(path)`
    pub fn fs_stat(&self, path: &str) -> Result<FileStat, BridgeError> {
        self.check("fs:stat", path)?;
        let meta = fs::metadata(path)?;
        let modified_at = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        Ok(FileStat {
            path: path.to_string(),
            size: meta.len(),
            is_file: meta.is_file(),
            is_directory: meta.is_dir(),
            modified_at,
        })
    }

    /// `nexus.fs.watch(path)` — registers a watch and returns its shared
    /// handle. The path must exist.
    pub fn fs_watch(&self, path: &str) -> Result<Arc<WatchRegistration>, BridgeError> {
        self.check("fs:watch", path)?;
        if !Path::new(path).exists() {
            return Err(BridgeError::BadArgument(format!("no such path: {path}")));
        }
        let registration = Arc::new(WatchRegistration {
            path: path.to_string(),
        });
        self.watches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(registration.clone());
        debug!(path, "watch registered");
        Ok(registration)
    }

    // ── process ─────────────────────────────────────────────────────

    /// `nexus.proc.exec(cmd)` — run a command line, capture stdout.
    pub fn proc_exec(&self, cmd: &str) -> Result<String, BridgeError> {
        self.check("proc:exec", cmd)?;
        let mut parts = cmd.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| BridgeError::BadArgument("empty command".into()))?;
        let output = std::process::Command::new(program).args(parts).output()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// `nexus.proc.list()` — fixed-format listing including this
    /// process.
    pub fn proc_list(&self) -> Result<Vec<ProcInfo>, BridgeError> {
        self.check("proc:list", "")?;
        Ok(vec![ProcInfo {
            pid: std::process::id(),
            command: "nexsh".to_string(),
        }])
    }

    /// `nexus.proc.kill(pid)` — the signal delivery itself is the
    /// external collaborator's job; the host validates and acknowledges.
    pub fn proc_kill(&self, pid: &str) -> Result<String, BridgeError> {
        let pid: u32 = pid
            .parse()
            .map_err(|_| BridgeError::BadArgument(format!("invalid pid: {pid}")))?;
        self.check("proc:kill", &pid.to_string())?;
        Ok(format!("signal sent to process {pid}"))
    }

    /// `nexus.proc.info(pid)`
    pub fn proc_info(&self, pid: u32) -> Result<ProcInfo, BridgeError> {
        self.check("proc:info", &pid.to_string())?;
        let command = if pid == std::process::id() {
            "nexsh".to_string()
        } else {
            "unknown".to_string()
        };
        Ok(ProcInfo { pid, command })
    }

    // ── network ─────────────────────────────────────────────────────
    //
    // The contract slots exist, but this kernel ships no transport;
    // network I/O belongs to an external collaborator.

    pub fn net_get(&self, _url: &str) -> Result<String, BridgeError> {
        Err(BridgeError::Unsupported("network get"))
    }

    pub fn net_post(&self, _url: &str, _body: &str) -> Result<String, BridgeError> {
        Err(BridgeError::Unsupported("network post"))
    }

    pub fn net_download(&self, _url: &str, _path: &str) -> Result<String, BridgeError> {
        Err(BridgeError::Unsupported("network download"))
    }

    /// Paths with active watch registrations.
    pub fn watched_paths(&self) -> Vec<String> {
        self.watches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|w| w.path.clone())
            .collect()
    }
}
