//! Storage collaborator
//!
//! Collections, environments, globals, monitors and run history are
//! persisted by the host application, keyed by workspace id. The engine
//! only depends on the [`WorkspaceStore`] trait; implementations must
//! tolerate missing or corrupt data by returning empty defaults, never
//! by erroring.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

use crate::models::{Collection, Environment, Monitor, MonitorRunRecord, Variable};

/// Workspace-keyed persistence boundary
pub trait WorkspaceStore: Send + Sync {
    fn collections(&self, workspace: &str) -> Vec<Collection>;
    fn set_collections(&self, workspace: &str, collections: &[Collection]);

    fn environments(&self, workspace: &str) -> Vec<Environment>;
    fn set_environments(&self, workspace: &str, environments: &[Environment]);

    fn globals(&self, workspace: &str) -> Vec<Variable>;
    fn set_globals(&self, workspace: &str, globals: &[Variable]);

    fn monitors(&self, workspace: &str) -> Vec<Monitor>;
    fn set_monitors(&self, workspace: &str, monitors: &[Monitor]);

    /// Newest-first monitor run history
    fn monitor_history(&self, workspace: &str) -> Vec<MonitorRunRecord>;

    /// Prepend a record and truncate to `cap`. Must be an atomic
    /// read-modify-write: concurrent monitor runs append to the same
    /// list.
    fn append_monitor_record(&self, workspace: &str, record: MonitorRunRecord, cap: usize);

    /// Stamp a monitor's `last_run_at`, regardless of run outcome
    fn update_monitor_last_run(&self, workspace: &str, monitor_id: &str, timestamp_ms: i64);
}

/// In-memory store used by tests and single-process deployments.
///
/// Values are kept as serialized JSON, the same shape a key-value backend
/// would hold, so the corrupt-data tolerance of the trait is exercised
/// for real: unparsable entries deserialize to empty defaults.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(workspace: &str, kind: &str) -> String {
        format!("{}/{}", workspace, kind)
    }

    fn read<T: DeserializeOwned + Default>(&self, workspace: &str, kind: &str) -> T {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        match entries.get(&Self::key(workspace, kind)) {
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                warn!(workspace, kind, error = %e, "corrupt store entry, using default");
                T::default()
            }),
            None => T::default(),
        }
    }

    fn write<T: Serialize>(&self, workspace: &str, kind: &str, value: &T) {
        if let Ok(raw) = serde_json::to_string(value) {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            entries.insert(Self::key(workspace, kind), raw);
        }
    }

    /// Mutate one entry under the write lock
    fn update<T, F>(&self, workspace: &str, kind: &str, mutate: F)
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T),
    {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let key = Self::key(workspace, kind);
        let mut value: T = entries
            .get(&key)
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();
        mutate(&mut value);
        if let Ok(raw) = serde_json::to_string(&value) {
            entries.insert(key, raw);
        }
    }
}

impl WorkspaceStore for MemoryStore {
    fn collections(&self, workspace: &str) -> Vec<Collection> {
        self.read(workspace, "collections")
    }

    fn set_collections(&self, workspace: &str, collections: &[Collection]) {
        self.write(workspace, "collections", &collections);
    }

    fn environments(&self, workspace: &str) -> Vec<Environment> {
        self.read(workspace, "environments")
    }

    fn set_environments(&self, workspace: &str, environments: &[Environment]) {
        self.write(workspace, "environments", &environments);
    }

    fn globals(&self, workspace: &str) -> Vec<Variable> {
        self.read(workspace, "globals")
    }

    fn set_globals(&self, workspace: &str, globals: &[Variable]) {
        self.write(workspace, "globals", &globals);
    }

    fn monitors(&self, workspace: &str) -> Vec<Monitor> {
        self.read(workspace, "monitors")
    }

    fn set_monitors(&self, workspace: &str, monitors: &[Monitor]) {
        self.write(workspace, "monitors", &monitors);
    }

    fn monitor_history(&self, workspace: &str) -> Vec<MonitorRunRecord> {
        self.read(workspace, "monitor_history")
    }

    fn append_monitor_record(&self, workspace: &str, record: MonitorRunRecord, cap: usize) {
        self.update(
            workspace,
            "monitor_history",
            |history: &mut Vec<MonitorRunRecord>| {
                history.insert(0, record);
                history.truncate(cap);
            },
        );
    }

    fn update_monitor_last_run(&self, workspace: &str, monitor_id: &str, timestamp_ms: i64) {
        self.update(workspace, "monitors", |monitors: &mut Vec<Monitor>| {
            if let Some(monitor) = monitors.iter_mut().find(|m| m.id == monitor_id) {
                monitor.last_run_at = Some(timestamp_ms);
            }
        });
    }
}
