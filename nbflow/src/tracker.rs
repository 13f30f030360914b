//! Execution tracking for asynchronous external tool runs
//!
//! The tracker owns the set of known jobs and supervises every running one
//! with its own polling task: a fixed-interval status fetch against the
//! execution service until the job reaches a terminal state. Jobs are
//! isolated from each other; a slow or failing poll for one job never
//! delays another. Terminal transitions are fanned out on a broadcast
//! channel so the pipeline layer can reconcile them into workflow state.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use crate::launcher::{CommandSpec, JobLauncher, JobStatus, JobStatusReport};
use crate::notifications::NotificationHub;

/// Tunables for the polling protocol.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Interval between status fetches for a running job.
    pub poll_interval: Duration,
    /// Consecutive poll failures tolerated before the job is marked failed.
    pub max_poll_failures: u32,
    /// Local wall-clock budget after which a job is marked timed out.
    pub job_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_poll_failures: 3,
            job_timeout: Duration::from_secs(600),
        }
    }
}

/// One tracked external-process invocation.
///
/// `stdout`/`stderr` hold the authoritative full logs as last reported by
/// the execution service; they are frozen once the status leaves `Running`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub command: CommandSpec,
    pub submitted_at: DateTime<Local>,
    pub status: JobStatus,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl Job {
    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    pub fn log_size(&self) -> usize {
        self.stdout.len() + self.stderr.len()
    }
}

/// Emitted once per job, when it reaches its terminal state.
#[derive(Debug, Clone)]
pub struct JobEvent {
    pub job: Job,
}

struct JobEntry {
    job: Job,
    consecutive_failures: u32,
    poll_in_flight: bool,
}

type JobMap = Arc<Mutex<HashMap<String, JobEntry>>>;

/// Supervisor for all known jobs.
pub struct ExecutionTracker {
    launcher: Arc<dyn JobLauncher>,
    jobs: JobMap,
    events_tx: broadcast::Sender<JobEvent>,
    notifications: NotificationHub,
    config: TrackerConfig,
}

impl ExecutionTracker {
    pub fn new(
        launcher: Arc<dyn JobLauncher>,
        config: TrackerConfig,
        notifications: NotificationHub,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            launcher,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            events_tx,
            notifications,
            config,
        }
    }

    /// Subscribe to terminal job transitions.
    pub fn subscribe_events(&self) -> broadcast::Receiver<JobEvent> {
        self.events_tx.subscribe()
    }

    /// Submit a command for execution and begin supervising it.
    ///
    /// Returns the registered job snapshot as soon as the service has
    /// acknowledged the submission; the process runs out-of-band.
    pub async fn submit(&self, spec: CommandSpec) -> Result<Job> {
        let ack = self.launcher.submit(&spec).await.map_err(|e| {
            self.notifications
                .error("Job submission failed", e.to_string());
            e
        })?;

        let job = Job {
            id: ack.execution_id,
            command: spec,
            submitted_at: Local::now(),
            status: JobStatus::Running,
            stdout: Vec::new(),
            stderr: Vec::new(),
        };

        self.jobs.lock().unwrap().insert(
            job.id.clone(),
            JobEntry {
                job: job.clone(),
                consecutive_failures: 0,
                poll_in_flight: false,
            },
        );

        self.notifications
            .info("Job submitted", format!("{} ({})", job.command.program, job.id));

        self.spawn_poll_task(job.id.clone());
        Ok(job)
    }

    /// Re-register a previously known job, e.g. when resuming a session.
    /// Polling restarts only if the job is still running.
    pub fn register_job(&self, job: Job) {
        let running = job.is_running();
        let id = job.id.clone();
        self.jobs.lock().unwrap().insert(
            id.clone(),
            JobEntry {
                job,
                consecutive_failures: 0,
                poll_in_flight: false,
            },
        );
        if running {
            self.spawn_poll_task(id);
        }
    }

    /// Snapshot of a single job.
    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs
            .lock()
            .unwrap()
            .get(job_id)
            .map(|entry| entry.job.clone())
    }

    /// Perform one out-of-band status fetch and return the updated snapshot.
    ///
    /// A transient fetch failure leaves the job untouched and surfaces a
    /// warning; the supervised polling loop keeps its own failure budget.
    pub async fn poll(&self, job_id: &str) -> Result<Job> {
        let snapshot = self
            .get(job_id)
            .ok_or_else(|| anyhow!("Unknown job: {}", job_id))?;
        if !snapshot.is_running() {
            return Ok(snapshot);
        }

        match self.launcher.status(job_id).await {
            Ok(report) => match apply_report(&self.jobs, job_id, report) {
                Some((job, became_terminal)) => {
                    if became_terminal {
                        emit_terminal(&self.events_tx, &self.notifications, &job);
                    }
                    Ok(job)
                }
                None => Err(anyhow!("Unknown job: {}", job_id)),
            },
            Err(e) => {
                self.notifications
                    .warning("Status poll failed", e.to_string());
                Ok(snapshot)
            }
        }
    }

    /// Request cancellation of a running job.
    ///
    /// Best-effort: the job transitions to `Terminated` only when the
    /// service acknowledges the request; otherwise it stays running and
    /// continues to be polled. Terminating a job that is not running is a
    /// no-op returning the unchanged snapshot.
    pub async fn terminate(&self, job_id: &str) -> Result<Job> {
        let snapshot = self
            .get(job_id)
            .ok_or_else(|| anyhow!("Unknown job: {}", job_id))?;
        if !snapshot.is_running() {
            return Ok(snapshot);
        }

        let acknowledged = match self.launcher.terminate(job_id).await {
            Ok(ack) => ack,
            Err(e) => {
                self.notifications
                    .warning("Terminate request failed", e.to_string());
                false
            }
        };

        if !acknowledged {
            self.notifications.warning(
                "Terminate not acknowledged",
                format!("Job {} is still running", job_id),
            );
            return Ok(self.get(job_id).unwrap_or(snapshot));
        }

        match mark_terminal(
            &self.jobs,
            job_id,
            JobStatus::Terminated,
            Some("Execution was manually terminated.".to_string()),
        ) {
            Some(job) => {
                emit_terminal(&self.events_tx, &self.notifications, &job);
                Ok(job)
            }
            // Finished on its own between the check and the acknowledgement
            None => Ok(self.get(job_id).unwrap_or(snapshot)),
        }
    }

    /// Snapshot of all known jobs, most recently submitted first.
    ///
    /// Non-terminal jobs are first refreshed against the service's list
    /// endpoint; any that turned terminal get one full status fetch so the
    /// final logs are captured before they freeze.
    pub async fn list(&self) -> Vec<Job> {
        let stale: Vec<String> = {
            let map = self.jobs.lock().unwrap();
            map.values()
                .filter(|e| e.job.is_running() && !e.poll_in_flight)
                .map(|e| e.job.id.clone())
                .collect()
        };

        if !stale.is_empty() {
            if let Ok(summaries) = self.launcher.list().await {
                let changed: Vec<String> = summaries
                    .into_iter()
                    .filter(|s| s.status.is_terminal() && stale.contains(&s.execution_id))
                    .map(|s| s.execution_id)
                    .collect();
                let refreshes = changed.iter().map(|id| self.refresh_job(id));
                futures::future::join_all(refreshes).await;
            }
        }

        let mut jobs: Vec<Job> = {
            let map = self.jobs.lock().unwrap();
            map.values().map(|e| e.job.clone()).collect()
        };
        jobs.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        jobs
    }

    async fn refresh_job(&self, job_id: &str) {
        if let Ok(report) = self.launcher.status(job_id).await {
            if let Some((job, became_terminal)) = apply_report(&self.jobs, job_id, report) {
                if became_terminal {
                    emit_terminal(&self.events_tx, &self.notifications, &job);
                }
            }
        }
    }

    fn spawn_poll_task(&self, job_id: String) {
        let launcher = self.launcher.clone();
        let jobs = self.jobs.clone();
        let events_tx = self.events_tx.clone();
        let notifications = self.notifications.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            poll_until_terminal(job_id, launcher, jobs, events_tx, notifications, config).await;
        });
    }
}

/// Supervised polling loop for one job. Exits permanently at the first
/// observed terminal state; it is never restarted except via explicit
/// re-registration.
async fn poll_until_terminal(
    job_id: String,
    launcher: Arc<dyn JobLauncher>,
    jobs: JobMap,
    events_tx: broadcast::Sender<JobEvent>,
    notifications: NotificationHub,
    config: TrackerConfig,
) {
    let started = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval(config.poll_interval);
    // One outstanding poll at a time: the loop is sequential, and ticks
    // that elapse while a fetch is in flight are skipped.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        {
            let mut map = jobs.lock().unwrap();
            match map.get_mut(&job_id) {
                Some(entry) if entry.job.is_running() => entry.poll_in_flight = true,
                _ => return,
            }
        }

        if started.elapsed() >= config.job_timeout {
            if let Some(job) = mark_terminal(
                &jobs,
                &job_id,
                JobStatus::Timeout,
                Some("Execution timed out and was terminated.".to_string()),
            ) {
                emit_terminal(&events_tx, &notifications, &job);
                // Best-effort cancellation request; local state is already final
                let launcher = launcher.clone();
                let id = job_id.clone();
                tokio::spawn(async move {
                    let _ = launcher.terminate(&id).await;
                });
            }
            return;
        }

        match launcher.status(&job_id).await {
            Ok(report) => match apply_report(&jobs, &job_id, report) {
                Some((job, became_terminal)) => {
                    if became_terminal {
                        emit_terminal(&events_tx, &notifications, &job);
                        return;
                    }
                }
                None => return,
            },
            Err(e) => match record_poll_failure(&jobs, &job_id, config.max_poll_failures, &e) {
                PollFailure::Transient(attempt) => {
                    notifications.warning(
                        "Status poll failed",
                        format!("{} (attempt {}/{})", e, attempt, config.max_poll_failures),
                    );
                }
                PollFailure::Exhausted(job) => {
                    emit_terminal(&events_tx, &notifications, &job);
                    return;
                }
                PollFailure::Gone => return,
            },
        }
    }
}

enum PollFailure {
    Transient(u32),
    Exhausted(Job),
    Gone,
}

/// Merge one status report into the job map.
///
/// The fetched stdout/stderr are the full authoritative logs and replace
/// the stored ones. Returns the updated snapshot and whether this report
/// moved the job to a terminal state. A job already terminal is left
/// untouched (first terminal state wins, logs stay frozen).
fn apply_report(jobs: &JobMap, job_id: &str, report: JobStatusReport) -> Option<(Job, bool)> {
    let mut map = jobs.lock().unwrap();
    let entry = map.get_mut(job_id)?;
    entry.poll_in_flight = false;

    if !entry.job.is_running() {
        return Some((entry.job.clone(), false));
    }

    entry.consecutive_failures = 0;
    entry.job.stdout = report.stdout;
    entry.job.stderr = report.stderr;

    let became_terminal = report.status.is_terminal();
    if became_terminal {
        entry.job.status = report.status;
    }
    Some((entry.job.clone(), became_terminal))
}

fn record_poll_failure(
    jobs: &JobMap,
    job_id: &str,
    max_failures: u32,
    error: &anyhow::Error,
) -> PollFailure {
    let mut map = jobs.lock().unwrap();
    let entry = match map.get_mut(job_id) {
        Some(entry) => entry,
        None => return PollFailure::Gone,
    };
    entry.poll_in_flight = false;

    if !entry.job.is_running() {
        return PollFailure::Gone;
    }

    entry.consecutive_failures += 1;
    if entry.consecutive_failures >= max_failures {
        entry.job.status = JobStatus::Failed;
        entry.job.stderr.push(format!(
            "Job status unknown after {} consecutive poll failures: {}",
            entry.consecutive_failures, error
        ));
        PollFailure::Exhausted(entry.job.clone())
    } else {
        PollFailure::Transient(entry.consecutive_failures)
    }
}

/// Force a running job into a terminal state, optionally appending a local
/// explanatory line to stderr before the logs freeze. Returns `None` if the
/// job is unknown or already terminal.
fn mark_terminal(
    jobs: &JobMap,
    job_id: &str,
    status: JobStatus,
    note: Option<String>,
) -> Option<Job> {
    let mut map = jobs.lock().unwrap();
    let entry = map.get_mut(job_id)?;
    entry.poll_in_flight = false;

    if !entry.job.is_running() {
        return None;
    }

    entry.job.status = status;
    if let Some(note) = note {
        entry.job.stderr.push(note);
    }
    Some(entry.job.clone())
}

fn emit_terminal(
    events_tx: &broadcast::Sender<JobEvent>,
    notifications: &NotificationHub,
    job: &Job,
) {
    match job.status {
        JobStatus::Completed => {
            notifications.success("Job completed", job.id.clone());
        }
        JobStatus::Failed => {
            let detail = job
                .stderr
                .last()
                .cloned()
                .unwrap_or_else(|| job.id.clone());
            notifications.error("Job failed", detail);
        }
        JobStatus::Timeout => {
            notifications.error("Job timed out", job.id.clone());
        }
        JobStatus::Terminated => {
            notifications.warning("Job terminated", job.id.clone());
        }
        JobStatus::Running => {}
    }
    let _ = events_tx.send(JobEvent { job: job.clone() });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::{JobAck, JobSummary};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted stand-in for the execution service. Status reports are
    /// consumed in order; the last one repeats.
    struct ScriptedLauncher {
        reports: Mutex<Vec<JobStatusReport>>,
        status_calls: AtomicUsize,
        terminate_calls: AtomicUsize,
        poll_error: bool,
        terminate_ack: bool,
    }

    impl ScriptedLauncher {
        fn new(reports: Vec<JobStatusReport>) -> Arc<Self> {
            Arc::new(Self {
                reports: Mutex::new(reports),
                status_calls: AtomicUsize::new(0),
                terminate_calls: AtomicUsize::new(0),
                poll_error: false,
                terminate_ack: true,
            })
        }

        fn always_running() -> Arc<Self> {
            Self::new(vec![running_report(vec![])])
        }

        fn erroring() -> Arc<Self> {
            Arc::new(Self {
                reports: Mutex::new(vec![]),
                status_calls: AtomicUsize::new(0),
                terminate_calls: AtomicUsize::new(0),
                poll_error: true,
                terminate_ack: true,
            })
        }

        fn with_terminate_ack(self: Arc<Self>, ack: bool) -> Arc<Self> {
            let inner = Arc::try_unwrap(self).ok().unwrap();
            Arc::new(Self {
                terminate_ack: ack,
                ..inner
            })
        }

        fn status_count(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobLauncher for ScriptedLauncher {
        async fn submit(&self, _spec: &CommandSpec) -> Result<JobAck> {
            Ok(JobAck {
                execution_id: "nb5_1".to_string(),
            })
        }

        async fn status(&self, _job_id: &str) -> Result<JobStatusReport> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            if self.poll_error {
                return Err(anyhow!("connection refused"));
            }
            let mut reports = self.reports.lock().unwrap();
            if reports.len() > 1 {
                Ok(reports.remove(0))
            } else {
                Ok(reports[0].clone())
            }
        }

        async fn terminate(&self, _job_id: &str) -> Result<bool> {
            self.terminate_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.terminate_ack)
        }

        async fn list(&self) -> Result<Vec<JobSummary>> {
            Ok(vec![])
        }

        async fn health(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn running_report(stdout: Vec<&str>) -> JobStatusReport {
        JobStatusReport {
            status: JobStatus::Running,
            stdout: stdout.into_iter().map(String::from).collect(),
            stderr: vec![],
        }
    }

    fn completed_report(stdout: Vec<&str>) -> JobStatusReport {
        JobStatusReport {
            status: JobStatus::Completed,
            stdout: stdout.into_iter().map(String::from).collect(),
            stderr: vec![],
        }
    }

    fn fast_config() -> TrackerConfig {
        TrackerConfig {
            poll_interval: Duration::from_millis(10),
            max_poll_failures: 3,
            job_timeout: Duration::from_secs(60),
        }
    }

    fn spec() -> CommandSpec {
        CommandSpec::new("java", vec!["-jar".into(), "nb5.jar".into()])
    }

    fn tracker(launcher: Arc<ScriptedLauncher>, config: TrackerConfig) -> ExecutionTracker {
        ExecutionTracker::new(launcher, config, NotificationHub::new())
    }

    #[tokio::test]
    async fn test_submit_returns_running_job_with_empty_logs() {
        let tracker = tracker(ScriptedLauncher::always_running(), fast_config());
        let job = tracker.submit(spec()).await.unwrap();

        assert_eq!(job.id, "nb5_1");
        assert!(job.is_running());
        assert!(job.stdout.is_empty());
        assert!(job.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_polling_stops_after_terminal_state() {
        let launcher = ScriptedLauncher::new(vec![
            running_report(vec![]),
            running_report(vec!["starting"]),
            completed_report(vec!["ok"]),
        ]);
        let tracker = tracker(launcher.clone(), fast_config());
        tracker.submit(spec()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        let job = tracker.get("nb5_1").unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(!job.is_running());
        assert_eq!(job.stdout, vec!["ok".to_string()]);

        // Poll count is frozen once the job is terminal
        let frozen = launcher.status_count();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(launcher.status_count(), frozen);
    }

    #[tokio::test]
    async fn test_poll_overwrites_logs_instead_of_appending() {
        let launcher = ScriptedLauncher::new(vec![
            running_report(vec!["a"]),
            running_report(vec!["a", "b"]),
            completed_report(vec!["a", "b", "c"]),
        ]);
        let config = TrackerConfig {
            poll_interval: Duration::from_secs(3600),
            ..fast_config()
        };
        let tracker = tracker(launcher, config);
        tracker.submit(spec()).await.unwrap();

        // Let the supervised task take its immediate first poll
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(tracker.get("nb5_1").unwrap().stdout, vec!["a".to_string()]);

        let job = tracker.poll("nb5_1").await.unwrap();
        assert_eq!(job.stdout, vec!["a".to_string(), "b".to_string()]);

        let job = tracker.poll("nb5_1").await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(
            job.stdout,
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[tokio::test]
    async fn test_transient_poll_failure_leaves_status_unchanged() {
        let launcher = ScriptedLauncher::erroring();
        let hub = NotificationHub::new();
        let config = TrackerConfig {
            poll_interval: Duration::from_secs(3600),
            max_poll_failures: 100,
            ..fast_config()
        };
        let tracker = ExecutionTracker::new(launcher, config, hub.clone());
        tracker.submit(spec()).await.unwrap();

        let job = tracker.poll("nb5_1").await.unwrap();
        assert!(job.is_running());
        assert!(hub
            .active()
            .iter()
            .any(|n| n.title == "Status poll failed"));
    }

    #[tokio::test]
    async fn test_consecutive_poll_failures_mark_job_failed() {
        let launcher = ScriptedLauncher::erroring();
        let tracker = tracker(launcher, fast_config());
        let mut events = tracker.subscribe_events();
        tracker.submit(spec()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        let job = tracker.get("nb5_1").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job
            .stderr
            .iter()
            .any(|line| line.contains("status unknown")));

        let event = tokio::time::timeout(Duration::from_millis(100), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_terminate_with_acknowledgement() {
        let launcher = ScriptedLauncher::always_running();
        let tracker = tracker(launcher, fast_config());
        tracker.submit(spec()).await.unwrap();

        let job = tracker.terminate("nb5_1").await.unwrap();
        assert_eq!(job.status, JobStatus::Terminated);
        assert!(job
            .stderr
            .iter()
            .any(|line| line.contains("manually terminated")));
    }

    #[tokio::test]
    async fn test_terminate_without_acknowledgement_keeps_running() {
        let launcher = ScriptedLauncher::always_running().with_terminate_ack(false);
        let tracker = tracker(launcher.clone(), fast_config());
        tracker.submit(spec()).await.unwrap();

        let job = tracker.terminate("nb5_1").await.unwrap();
        assert_eq!(job.status, JobStatus::Running);

        // Still supervised: polls keep arriving
        let before = launcher.status_count();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(launcher.status_count() > before);
    }

    #[tokio::test]
    async fn test_terminate_on_terminal_job_is_noop() {
        let launcher = ScriptedLauncher::new(vec![completed_report(vec!["ok"])]);
        let tracker = tracker(launcher.clone(), fast_config());
        tracker.submit(spec()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(tracker.get("nb5_1").unwrap().status, JobStatus::Completed);

        let job = tracker.terminate("nb5_1").await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(launcher.terminate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_local_timeout_marks_job_timed_out() {
        let launcher = ScriptedLauncher::always_running();
        let config = TrackerConfig {
            poll_interval: Duration::from_millis(10),
            max_poll_failures: 3,
            job_timeout: Duration::from_millis(50),
        };
        let tracker = tracker(launcher.clone(), config);
        tracker.submit(spec()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        let job = tracker.get("nb5_1").unwrap();
        assert_eq!(job.status, JobStatus::Timeout);
        assert!(job.stderr.iter().any(|line| line.contains("timed out")));

        // The cancellation request was still sent, best-effort
        assert!(launcher.terminate_calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_terminal_event_broadcast() {
        let launcher = ScriptedLauncher::new(vec![completed_report(vec!["ok"])]);
        let tracker = tracker(launcher, fast_config());
        let mut events = tracker.subscribe_events();
        tracker.submit(spec()).await.unwrap();

        let event = tokio::time::timeout(Duration::from_millis(500), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.job.id, "nb5_1");
        assert_eq!(event.job.status, JobStatus::Completed);
        assert_eq!(event.job.log_size(), 1);
    }

    #[tokio::test]
    async fn test_list_most_recent_first() {
        let launcher = ScriptedLauncher::always_running();
        let tracker = tracker(launcher, fast_config());

        let older = Job {
            id: "nb5_old".to_string(),
            command: spec(),
            submitted_at: Local::now() - chrono::Duration::minutes(5),
            status: JobStatus::Completed,
            stdout: vec![],
            stderr: vec![],
        };
        let newer = Job {
            id: "nb5_new".to_string(),
            command: spec(),
            submitted_at: Local::now(),
            status: JobStatus::Failed,
            stdout: vec![],
            stderr: vec![],
        };
        tracker.register_job(older);
        tracker.register_job(newer);

        let jobs = tracker.list().await;
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, "nb5_new");
        assert_eq!(jobs[1].id, "nb5_old");
    }

    #[tokio::test]
    async fn test_unknown_job_poll_is_an_error() {
        let tracker = tracker(ScriptedLauncher::always_running(), fast_config());
        assert!(tracker.poll("missing").await.is_err());
        assert!(tracker.get("missing").is_none());
    }
}
