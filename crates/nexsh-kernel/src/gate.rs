//! Permission gate — the capability check performed before every command
//! execution and every scripting host call.
//!
//! Only the contract matters to the kernel: `check_permission` answers
//! whether a capability may act on a resource. Grants come in two shapes:
//! capability-wide (any resource) and per-resource. Every decision is
//! appended to an audit log.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tracing::warn;

/// Capabilities granted to every fresh gate. The interactive shell is the
/// trusted baseline; embedders revoke from here.
const DEFAULT_GRANTS: &[&str] = &[
    "command:execute",
    "fs:read",
    "fs:write",
    "fs:list",
    "fs:stat",
    "fs:watch",
    "proc:exec",
    "proc:list",
    "proc:kill",
    "proc:info",
];

struct GateState {
    /// Capability-wide grants (apply to any resource).
    granted: HashSet<String>,
    /// Per-resource grants: capability -> allowed resources.
    resource_grants: HashMap<String, HashSet<String>>,
    /// Explicit denials override grants; capability -> denied resources
    /// (empty set denies the capability for every resource).
    denials: HashMap<String, HashSet<String>>,
    audit: Vec<String>,
}

/// Thread-safe permission store.
pub struct PermissionGate {
    state: Mutex<GateState>,
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionGate {
    /// A gate with the default interactive grants.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                granted: DEFAULT_GRANTS.iter().map(|s| s.to_string()).collect(),
                resource_grants: HashMap::new(),
                denials: HashMap::new(),
                audit: Vec::new(),
            }),
        }
    }

    /// A gate that grants nothing.
    pub fn deny_all() -> Self {
        Self {
            state: Mutex::new(GateState {
                granted: HashSet::new(),
                resource_grants: HashMap::new(),
                denials: HashMap::new(),
                audit: Vec::new(),
            }),
        }
    }

    /// Check a capability against a resource, recording the decision.
    pub fn check_permission(&self, capability: &str, resource: &str) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let denied = match state.denials.get(capability) {
            Some(resources) => resources.is_empty() || resources.contains(resource),
            None => false,
        };
        let granted = !denied
            && (state.granted.contains(capability)
                || state
                    .resource_grants
                    .get(capability)
                    .is_some_and(|r| r.contains(resource)));

        state.audit.push(format!(
            "{} {capability} resource={resource:?}",
            if granted { "ALLOW" } else { "DENY" }
        ));
        if !granted {
            warn!(capability, resource, "permission denied");
        }
        granted
    }

    /// Grant a capability for every resource.
    pub fn grant(&self, capability: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.denials.remove(capability);
        state.granted.insert(capability.to_string());
    }

    /// Grant a capability for one resource.
    pub fn grant_resource(&self, capability: &str, resource: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .resource_grants
            .entry(capability.to_string())
            .or_default()
            .insert(resource.to_string());
    }

    /// Revoke a capability entirely.
    pub fn revoke(&self, capability: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.granted.remove(capability);
        state.resource_grants.remove(capability);
        state.denials.insert(capability.to_string(), HashSet::new());
    }

    /// Deny a capability for one resource, overriding any grant.
    pub fn deny_resource(&self, capability: &str, resource: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .denials
            .entry(capability.to_string())
            .or_default()
            .insert(resource.to_string());
    }

    /// Snapshot of the audit log.
    pub fn audit_log(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .audit
            .clone()
    }

    pub fn clear_audit_log(&self) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .audit
            .clear();
    }
}
