//! Workflow state machine for the migration pipeline
//!
//! One `PipelineController` per session owns the currently active
//! `WorkflowInstance` and the history of prior runs. All mutation goes
//! through the controller; external readers get snapshots.

mod models;
mod ops;

pub use models::*;

use crate::notifications::NotificationHub;

/// Owner of the active workflow instance.
pub struct PipelineController {
    current: Option<WorkflowInstance>,
    history: Vec<WorkflowInstance>,
    notifications: NotificationHub,
}

impl PipelineController {
    pub fn new(notifications: NotificationHub) -> Self {
        Self {
            current: None,
            history: Vec::new(),
            notifications,
        }
    }

    /// Snapshot of the active instance, if any.
    pub fn current(&self) -> Option<WorkflowInstance> {
        self.current.clone()
    }

    /// Prior instances retained this session, most recent first.
    pub fn session_history(&self) -> Vec<WorkflowInstance> {
        self.history.iter().rev().cloned().collect()
    }

    pub fn is_idle(&self) -> bool {
        !matches!(
            self.current,
            Some(WorkflowInstance {
                status: WorkflowStatus::InProgress,
                ..
            })
        )
    }
}
