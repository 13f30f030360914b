//! Workflow operations
//!
//! State transitions for the active instance. Invalid transitions are never
//! fatal: they are logged, surfaced as warning notifications, and leave the
//! state untouched.

use chrono::Local;

use super::*;
use crate::launcher::JobStatus;
use crate::tracker::Job;

impl PipelineController {
    /// Begin a new workflow run.
    ///
    /// Only valid while idle or after the prior instance reached a terminal
    /// state; a second concurrent in-progress instance is rejected. The
    /// replaced instance is retained in the session history.
    pub fn start(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Option<WorkflowInstance> {
        if !self.is_idle() {
            self.notifications.warning(
                "Workflow already in progress",
                "Complete or fail the current migration before starting a new one",
            );
            return None;
        }

        if let Some(prior) = self.current.take() {
            self.history.push(prior);
        }

        let instance = WorkflowInstance::new(name, description);
        self.notifications
            .info("Migration started", instance.name.clone());
        self.current = Some(instance.clone());
        Some(instance)
    }

    /// Re-activate a previously saved instance without altering its step
    /// history. A completed instance stays completed; anything else becomes
    /// in-progress again.
    pub fn resume(&mut self, mut instance: WorkflowInstance) -> Option<WorkflowInstance> {
        if !self.is_idle() {
            self.notifications.warning(
                "Workflow already in progress",
                "Cannot resume while another migration is active",
            );
            return None;
        }

        if instance.status != WorkflowStatus::Completed {
            instance.status = WorkflowStatus::InProgress;
            instance.end_time = None;
        }

        if let Some(prior) = self.current.take() {
            self.history.push(prior);
        }

        self.notifications
            .info("Migration resumed", instance.name.clone());
        self.current = Some(instance.clone());
        Some(instance)
    }

    /// Append one record to the active instance's step log.
    ///
    /// Completing a stage also advances progress to the stage checkpoint.
    /// Without an active instance this is a warning-logged no-op.
    pub fn record_step(&mut self, update: StepUpdate) {
        let Some(instance) = self.current.as_mut() else {
            eprintln!(
                "Warning: step recorded with no active workflow: {:?}",
                update.stage
            );
            self.notifications.warning(
                "No active migration",
                format!("Ignored step for stage {}", update.stage.label()),
            );
            return;
        };

        let record = StepRecord {
            stage: update.stage,
            status: update.status,
            timestamp: Local::now(),
            details: update.details,
            error: update.error,
            job_id: update.job_id,
        };

        match record.status {
            StepStatus::InProgress => {
                self.notifications
                    .info("Stage started", update.stage.label());
            }
            StepStatus::Completed => {
                let checkpoint = update.stage.checkpoint();
                if checkpoint > instance.progress {
                    instance.progress = checkpoint;
                }
                self.notifications
                    .success("Stage completed", update.stage.label());
            }
            StepStatus::Failed => {
                // A failed stage does not fail the workflow; the operator
                // can retry it.
                let detail = record
                    .error
                    .clone()
                    .unwrap_or_else(|| update.stage.label().to_string());
                self.notifications.error("Stage failed", detail);
            }
        }

        instance.steps.push(record);
    }

    /// Raise progress to `value`. Regressions are silently ignored.
    pub fn advance_progress(&mut self, value: u8) {
        let Some(instance) = self.current.as_mut() else {
            return;
        };
        if instance.is_terminal() {
            return;
        }
        let value = value.min(100);
        if value > instance.progress {
            instance.progress = value;
        }
    }

    /// Mark the active instance terminal.
    ///
    /// Successful completion forces progress to 100; failure freezes it at
    /// its last value.
    pub fn complete(&mut self, status: WorkflowStatus) {
        if status == WorkflowStatus::InProgress {
            self.notifications
                .warning("Invalid transition", "Cannot complete into in-progress");
            return;
        }
        let Some(instance) = self.current.as_mut() else {
            self.notifications
                .warning("No active migration", "Nothing to complete");
            return;
        };

        instance.status = status;
        instance.end_time = Some(Local::now());
        if status == WorkflowStatus::Completed {
            instance.progress = 100;
            self.notifications
                .success("Migration completed", instance.name.clone());
        } else {
            self.notifications
                .error("Migration failed", instance.name.clone());
        }
    }

    /// Reconcile a terminal job into the step log.
    ///
    /// The stage is looked up from the step that submitted the job; a job
    /// no step claims is ignored with a warning.
    pub fn apply_job_outcome(&mut self, job: &Job) {
        let stage = match self.current.as_ref().and_then(|i| i.stage_for_job(&job.id)) {
            Some(stage) => stage,
            None => {
                self.notifications.warning(
                    "Unmatched job outcome",
                    format!("Job {} does not belong to the active migration", job.id),
                );
                return;
            }
        };

        let update = match job.status {
            JobStatus::Running => return,
            JobStatus::Completed => StepUpdate::new(stage, StepStatus::Completed)
                .with_details(format!("Job {} completed", job.id))
                .with_job(job.id.clone()),
            JobStatus::Failed => {
                let error = job
                    .stderr
                    .last()
                    .cloned()
                    .unwrap_or_else(|| format!("Job {} failed", job.id));
                StepUpdate::new(stage, StepStatus::Failed)
                    .with_error(error)
                    .with_job(job.id.clone())
            }
            JobStatus::Timeout => StepUpdate::new(stage, StepStatus::Failed)
                .with_error(format!("Job {} exceeded its time budget", job.id))
                .with_job(job.id.clone()),
            JobStatus::Terminated => StepUpdate::new(stage, StepStatus::Failed)
                .with_error(format!("Job {} was terminated", job.id))
                .with_job(job.id.clone()),
        };
        self.record_step(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::CommandSpec;
    use crate::notifications::NotificationHub;

    fn controller() -> PipelineController {
        PipelineController::new(NotificationHub::new())
    }

    fn job(id: &str, status: JobStatus, stderr: Vec<&str>) -> Job {
        Job {
            id: id.to_string(),
            command: CommandSpec::new("java", vec![]),
            submitted_at: Local::now(),
            status,
            stdout: vec![],
            stderr: stderr.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn test_start_then_record_then_advance() {
        let mut ctl = controller();
        ctl.start("Load Test", "desc").unwrap();
        ctl.record_step(StepUpdate::new(Stage::Schema, StepStatus::Completed));
        ctl.advance_progress(20);

        let instance = ctl.current().unwrap();
        assert_eq!(instance.progress, 20);
        assert_eq!(instance.status, WorkflowStatus::InProgress);
        assert_eq!(instance.steps.len(), 1);
    }

    #[test]
    fn test_steps_are_append_only() {
        let mut ctl = controller();
        ctl.start("Migration", "").unwrap();
        for _ in 0..5 {
            ctl.record_step(StepUpdate::new(Stage::Schema, StepStatus::InProgress));
        }
        assert_eq!(ctl.current().unwrap().steps.len(), 5);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut ctl = controller();
        ctl.start("Migration", "").unwrap();
        ctl.advance_progress(50);
        ctl.advance_progress(35);
        assert_eq!(ctl.current().unwrap().progress, 50);

        ctl.advance_progress(50);
        assert_eq!(ctl.current().unwrap().progress, 50);
    }

    #[test]
    fn test_second_concurrent_start_is_rejected() {
        let mut ctl = controller();
        let first = ctl.start("first", "").unwrap();
        assert!(ctl.start("second", "").is_none());
        assert_eq!(ctl.current().unwrap().id, first.id);
    }

    #[test]
    fn test_start_after_terminal_retains_history() {
        let mut ctl = controller();
        let first = ctl.start("first", "").unwrap();
        ctl.complete(WorkflowStatus::Failed);

        let second = ctl.start("second", "").unwrap();
        assert_ne!(first.id, second.id);

        let history = ctl.session_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, first.id);
    }

    #[test]
    fn test_complete_success_forces_progress_100() {
        let mut ctl = controller();
        ctl.start("Migration", "").unwrap();
        ctl.advance_progress(75);
        ctl.complete(WorkflowStatus::Completed);

        let instance = ctl.current().unwrap();
        assert_eq!(instance.progress, 100);
        assert!(instance.end_time.is_some());
    }

    #[test]
    fn test_complete_failed_freezes_progress() {
        let mut ctl = controller();
        ctl.start("Migration", "").unwrap();
        ctl.advance_progress(35);
        ctl.complete(WorkflowStatus::Failed);

        let instance = ctl.current().unwrap();
        assert_eq!(instance.progress, 35);
        assert_eq!(instance.status, WorkflowStatus::Failed);
    }

    #[test]
    fn test_failed_step_keeps_workflow_in_progress() {
        let mut ctl = controller();
        ctl.start("Migration", "").unwrap();
        ctl.record_step(
            StepUpdate::new(Stage::Unload, StepStatus::Failed).with_error("dsbulk exited 1"),
        );

        let instance = ctl.current().unwrap();
        assert_eq!(instance.status, WorkflowStatus::InProgress);
        assert_eq!(instance.stage_status(Stage::Unload), Some(StepStatus::Failed));
    }

    #[test]
    fn test_record_step_without_instance_is_noop() {
        let mut ctl = controller();
        ctl.record_step(StepUpdate::new(Stage::Schema, StepStatus::Completed));
        assert!(ctl.current().is_none());
    }

    #[test]
    fn test_stage_completion_advances_to_checkpoint() {
        let mut ctl = controller();
        ctl.start("Migration", "").unwrap();
        ctl.record_step(StepUpdate::new(Stage::WriteWorkload, StepStatus::Completed));
        assert_eq!(ctl.current().unwrap().progress, 35);

        // A later stage raises the checkpoint; an earlier one cannot lower it
        ctl.record_step(StepUpdate::new(Stage::Unload, StepStatus::Completed));
        assert_eq!(ctl.current().unwrap().progress, 75);
        ctl.record_step(StepUpdate::new(Stage::Schema, StepStatus::Completed));
        assert_eq!(ctl.current().unwrap().progress, 75);
    }

    #[test]
    fn test_resume_reactivates_unless_completed() {
        let mut ctl = controller();
        ctl.start("Migration", "").unwrap();
        ctl.complete(WorkflowStatus::Failed);
        let failed = ctl.current().unwrap();

        let mut other = controller();
        let resumed = other.resume(failed).unwrap();
        assert_eq!(resumed.status, WorkflowStatus::InProgress);
        assert!(resumed.end_time.is_none());

        let mut done = WorkflowInstance::new("done", "");
        done.status = WorkflowStatus::Completed;
        let mut third = controller();
        let resumed = third.resume(done).unwrap();
        assert_eq!(resumed.status, WorkflowStatus::Completed);
    }

    #[test]
    fn test_resume_preserves_step_history() {
        let mut ctl = controller();
        ctl.start("Migration", "").unwrap();
        ctl.record_step(StepUpdate::new(Stage::Schema, StepStatus::Completed));
        ctl.record_step(StepUpdate::new(Stage::WriteWorkload, StepStatus::InProgress));
        let saved = ctl.current().unwrap();

        let mut other = controller();
        let resumed = other.resume(saved.clone()).unwrap();
        assert_eq!(resumed.steps.len(), saved.steps.len());
        assert_eq!(resumed.id, saved.id);
    }

    #[test]
    fn test_apply_job_outcome_completed() {
        let mut ctl = controller();
        ctl.start("Migration", "").unwrap();
        ctl.record_step(
            StepUpdate::new(Stage::LoadExecution, StepStatus::InProgress).with_job("nb5_1"),
        );

        ctl.apply_job_outcome(&job("nb5_1", JobStatus::Completed, vec![]));

        let instance = ctl.current().unwrap();
        assert_eq!(
            instance.stage_status(Stage::LoadExecution),
            Some(StepStatus::Completed)
        );
        assert_eq!(instance.progress, Stage::LoadExecution.checkpoint());
    }

    #[test]
    fn test_apply_job_outcome_failure_carries_stderr() {
        let mut ctl = controller();
        ctl.start("Migration", "").unwrap();
        ctl.record_step(
            StepUpdate::new(Stage::ReadExecution, StepStatus::InProgress).with_job("nb5_2"),
        );

        ctl.apply_job_outcome(&job(
            "nb5_2",
            JobStatus::Failed,
            vec!["Process exited with return code 2"],
        ));

        let instance = ctl.current().unwrap();
        let last = instance.steps.last().unwrap();
        assert_eq!(last.status, StepStatus::Failed);
        assert!(last.error.as_deref().unwrap().contains("return code 2"));
        // Workflow itself stays in progress for retry
        assert_eq!(instance.status, WorkflowStatus::InProgress);
    }

    #[test]
    fn test_apply_job_outcome_unknown_job_ignored() {
        let mut ctl = controller();
        ctl.start("Migration", "").unwrap();
        ctl.apply_job_outcome(&job("nb5_zz", JobStatus::Completed, vec![]));
        assert!(ctl.current().unwrap().steps.is_empty());
    }
}
