//! Workflow snapshot persistence
//!
//! An adapter over a generic key-value substrate so an interrupted session
//! can offer "resume" instead of losing in-flight work. Snapshots are JSON;
//! anything unreadable is discarded, never fatal.

use anyhow::Result;
use chrono::{Duration, Local};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::notifications::NotificationHub;
use crate::pipeline::{WorkflowInstance, WorkflowStatus};
use crate::tracker::Job;

const CURRENT_KEY: &str = "workflow/current";
const HISTORY_KEY: &str = "workflow/history";
const JOBS_KEY: &str = "jobs/history";

/// Key-value persistence substrate. Values are JSON-serialized snapshots.
pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory substrate, for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Saves and restores workflow snapshots plus a bounded, deduplicated
/// rolling history.
pub struct PersistenceAdapter {
    store: Box<dyn SnapshotStore>,
    history_limit: usize,
    staleness: Duration,
    notifications: NotificationHub,
}

impl PersistenceAdapter {
    pub fn new(
        store: Box<dyn SnapshotStore>,
        history_limit: usize,
        staleness: Duration,
        notifications: NotificationHub,
    ) -> Self {
        Self {
            store,
            history_limit,
            staleness,
            notifications,
        }
    }

    /// Persist the instance as the current snapshot and fold it into the
    /// history. Idempotent: saving the same instance overwrites by id.
    pub fn save(&self, instance: &WorkflowInstance) -> Result<()> {
        let json = serde_json::to_string(instance)?;
        self.store.set(CURRENT_KEY, &json)?;

        let mut history = self.load_history();
        history.retain(|i| i.id != instance.id);
        history.insert(0, instance.clone());
        history.truncate(self.history_limit);
        self.store.set(HISTORY_KEY, &serde_json::to_string(&history)?)?;
        Ok(())
    }

    /// The most recent in-progress instance, unless it has gone stale.
    pub fn load_current(&self) -> Option<WorkflowInstance> {
        let raw = match self.store.get(CURRENT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                self.notifications
                    .warning("Snapshot read failed", e.to_string());
                return None;
            }
        };

        let instance: WorkflowInstance = match serde_json::from_str(&raw) {
            Ok(instance) => instance,
            Err(e) => {
                self.notifications
                    .warning("Discarded corrupt workflow snapshot", e.to_string());
                return None;
            }
        };

        if instance.status != WorkflowStatus::InProgress {
            return None;
        }
        if Local::now() - instance.start_time > self.staleness {
            return None;
        }
        Some(instance)
    }

    /// Saved history, most recent first, deduplicated by id.
    pub fn load_history(&self) -> Vec<WorkflowInstance> {
        let raw = match self.store.get(HISTORY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                self.notifications
                    .warning("History read failed", e.to_string());
                return Vec::new();
            }
        };

        let history: Vec<WorkflowInstance> = match serde_json::from_str(&raw) {
            Ok(history) => history,
            Err(e) => {
                self.notifications
                    .warning("Discarded corrupt workflow history", e.to_string());
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        history
            .into_iter()
            .filter(|i| seen.insert(i.id))
            .collect()
    }

    /// Fold one job snapshot into the persisted job history (deduplicated
    /// by id, most recent first, bounded like the workflow history).
    pub fn record_job(&self, job: &Job) -> Result<()> {
        let mut jobs = self.load_jobs();
        jobs.retain(|j| j.id != job.id);
        jobs.insert(0, job.clone());
        jobs.truncate(self.history_limit);
        self.store.set(JOBS_KEY, &serde_json::to_string(&jobs)?)?;
        Ok(())
    }

    /// Saved job snapshots, most recent first.
    pub fn load_jobs(&self) -> Vec<Job> {
        let raw = match self.store.get(JOBS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                self.notifications
                    .warning("Job history read failed", e.to_string());
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(jobs) => jobs,
            Err(e) => {
                self.notifications
                    .warning("Discarded corrupt job history", e.to_string());
                Vec::new()
            }
        }
    }
}
