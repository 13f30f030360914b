//! Pipeline data structures

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One named step of the fixed migration pipeline.
///
/// The order is the pipeline order; completing a stage advances workflow
/// progress to that stage's checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Schema,
    WriteWorkload,
    LoadExecution,
    Unload,
    ReadWorkload,
    ReadExecution,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Schema,
        Stage::WriteWorkload,
        Stage::LoadExecution,
        Stage::Unload,
        Stage::ReadWorkload,
        Stage::ReadExecution,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Schema => "Schema Upload",
            Stage::WriteWorkload => "Write Workload Generation",
            Stage::LoadExecution => "NB5 Load Execution",
            Stage::Unload => "DSBulk Unload",
            Stage::ReadWorkload => "Read Workload Generation",
            Stage::ReadExecution => "NB5 Read Execution",
        }
    }

    /// Progress checkpoint reached when this stage completes. Checkpoints
    /// are fixed rather than derived from elapsed time; stage durations
    /// vary too much for time to mean anything.
    pub fn checkpoint(&self) -> u8 {
        match self {
            Stage::Schema => 20,
            Stage::WriteWorkload => 35,
            Stage::LoadExecution => 50,
            Stage::Unload => 75,
            Stage::ReadWorkload => 90,
            Stage::ReadExecution => 100,
        }
    }

    pub fn next(&self) -> Option<Stage> {
        let idx = Stage::ALL.iter().position(|s| s == self)?;
        Stage::ALL.get(idx + 1).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStatus {
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    InProgress,
    Completed,
    Failed,
}

/// One entry in a workflow's append-only step log.
///
/// A stage may appear multiple times (in-progress, then completed); the
/// stage's current status is the latest record for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub stage: Stage,
    pub status: StepStatus,
    pub timestamp: DateTime<Local>,
    pub details: Option<String>,
    pub error: Option<String>,
    /// Tracker job backing this step, when the step ran as an external job.
    pub job_id: Option<String>,
}

/// Fields for a new step record; the controller stamps the timestamp.
#[derive(Debug, Clone)]
pub struct StepUpdate {
    pub stage: Stage,
    pub status: StepStatus,
    pub details: Option<String>,
    pub error: Option<String>,
    pub job_id: Option<String>,
}

impl StepUpdate {
    pub fn new(stage: Stage, status: StepStatus) -> Self {
        Self {
            stage,
            status,
            details: None,
            error: None,
            job_id: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_job(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }
}

/// One run of the full migration pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: WorkflowStatus,
    pub progress: u8,
    pub steps: Vec<StepRecord>,
    pub start_time: DateTime<Local>,
    pub end_time: Option<DateTime<Local>>,
}

impl WorkflowInstance {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            status: WorkflowStatus::InProgress,
            progress: 0,
            steps: Vec::new(),
            start_time: Local::now(),
            end_time: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != WorkflowStatus::InProgress
    }

    /// Latest recorded status for a stage, derived from the step log.
    pub fn stage_status(&self, stage: Stage) -> Option<StepStatus> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.stage == stage)
            .map(|s| s.status)
    }

    /// Stage an in-flight job was recorded against, if any.
    pub fn stage_for_job(&self, job_id: &str) -> Option<Stage> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.job_id.as_deref() == Some(job_id))
            .map(|s| s.stage)
    }
}
