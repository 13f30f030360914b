//! Session coordinator
//!
//! One `MigrationSession` per client session owns the tracker, the pipeline
//! state machine, the notification hub, and the persistence adapter; there
//! is no ambient state. A supervised background task reconciles terminal
//! job events into the workflow step log and keeps snapshots saved, so a
//! restarted client can offer resume.

use anyhow::Result;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;

use crate::config::Settings;
use crate::launcher::{CommandSpec, JobLauncher};
use crate::notifications::NotificationHub;
use crate::persistence::{PersistenceAdapter, SnapshotStore};
use crate::pipeline::{
    PipelineController, Stage, StepStatus, StepUpdate, WorkflowInstance, WorkflowStatus,
};
use crate::tracker::{ExecutionTracker, Job};

pub struct MigrationSession {
    tracker: ExecutionTracker,
    pipeline: Arc<Mutex<PipelineController>>,
    persistence: Arc<PersistenceAdapter>,
    notifications: NotificationHub,
}

impl MigrationSession {
    pub fn new(
        launcher: Arc<dyn JobLauncher>,
        store: Box<dyn SnapshotStore>,
        settings: &Settings,
    ) -> Self {
        let notifications = NotificationHub::new();
        let tracker = ExecutionTracker::new(
            launcher,
            settings.tracker_config(),
            notifications.clone(),
        );
        let persistence = Arc::new(PersistenceAdapter::new(
            store,
            settings.history_limit,
            settings.resume_staleness(),
            notifications.clone(),
        ));
        let pipeline = Arc::new(Mutex::new(PipelineController::new(notifications.clone())));

        let session = Self {
            tracker,
            pipeline,
            persistence,
            notifications,
        };
        session.spawn_reconciler();
        session
    }

    /// Map terminal job events into the workflow step log and persist the
    /// updated snapshot. Exits when the tracker goes away.
    fn spawn_reconciler(&self) {
        let mut events = self.tracker.subscribe_events();
        let pipeline = self.pipeline.clone();
        let persistence = self.persistence.clone();
        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                };

                if let Err(e) = persistence.record_job(&event.job) {
                    eprintln!("Warning: failed to persist job snapshot: {}", e);
                }

                let snapshot = {
                    let mut ctl = pipeline.lock().unwrap();
                    ctl.apply_job_outcome(&event.job);
                    ctl.current()
                };
                if let Some(instance) = snapshot {
                    if let Err(e) = persistence.save(&instance) {
                        eprintln!("Warning: failed to persist workflow snapshot: {}", e);
                    }
                }
            }
        });
    }

    /// Begin a new migration run. Returns `None` (with a warning published)
    /// if one is already in progress.
    pub fn start_workflow(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Option<WorkflowInstance> {
        let instance = self.pipeline.lock().unwrap().start(name, description)?;
        self.persist(&instance);
        Some(instance)
    }

    /// Offer the most recent saved in-progress run, re-activating it and
    /// re-registering its jobs (running ones resume polling).
    pub fn resume_last(&self) -> Option<WorkflowInstance> {
        let saved = self.persistence.load_current()?;
        let resumed = self.pipeline.lock().unwrap().resume(saved)?;
        for job in self.persistence.load_jobs() {
            self.tracker.register_job(job);
        }
        Some(resumed)
    }

    /// Submit a job for one pipeline stage and record the stage as
    /// in progress. The reconciler picks up the terminal outcome.
    pub async fn run_stage(&self, stage: Stage, spec: CommandSpec) -> Result<Job> {
        let job = self.tracker.submit(spec).await?;

        let snapshot = {
            let mut ctl = self.pipeline.lock().unwrap();
            ctl.record_step(
                StepUpdate::new(stage, StepStatus::InProgress)
                    .with_details(job.command.display.clone())
                    .with_job(job.id.clone()),
            );
            ctl.current()
        };
        if let Some(instance) = snapshot {
            self.persist(&instance);
        }
        if let Err(e) = self.persistence.record_job(&job) {
            eprintln!("Warning: failed to persist job snapshot: {}", e);
        }
        Ok(job)
    }

    /// Append a step that did not run as an external job (synchronous
    /// stages such as YAML generation).
    pub fn record_step(&self, update: StepUpdate) {
        let snapshot = {
            let mut ctl = self.pipeline.lock().unwrap();
            ctl.record_step(update);
            ctl.current()
        };
        if let Some(instance) = snapshot {
            self.persist(&instance);
        }
    }

    pub fn advance_progress(&self, value: u8) {
        let snapshot = {
            let mut ctl = self.pipeline.lock().unwrap();
            ctl.advance_progress(value);
            ctl.current()
        };
        if let Some(instance) = snapshot {
            self.persist(&instance);
        }
    }

    /// Mark the active run terminal.
    pub fn complete_workflow(&self, status: WorkflowStatus) {
        let snapshot = {
            let mut ctl = self.pipeline.lock().unwrap();
            ctl.complete(status);
            ctl.current()
        };
        if let Some(instance) = snapshot {
            self.persist(&instance);
        }
    }

    /// Snapshot of the active workflow, if any.
    pub fn workflow(&self) -> Option<WorkflowInstance> {
        self.pipeline.lock().unwrap().current()
    }

    /// Persisted workflow history, most recent first.
    pub fn history(&self) -> Vec<WorkflowInstance> {
        self.persistence.load_history()
    }

    pub fn tracker(&self) -> &ExecutionTracker {
        &self.tracker
    }

    pub fn notifications(&self) -> &NotificationHub {
        &self.notifications
    }

    fn persist(&self, instance: &WorkflowInstance) {
        if let Err(e) = self.persistence.save(instance) {
            eprintln!("Warning: failed to persist workflow snapshot: {}", e);
        }
    }
}
