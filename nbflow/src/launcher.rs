//! Job launcher interface to the external execution service
//!
//! The execution service owns the actual processes (nb5, dsbulk). This module
//! defines the contract the tracker consumes: submit acknowledges immediately
//! with an execution id, the process itself runs out-of-band, and status
//! fetches return the complete-so-far stdout/stderr as the source of truth.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Job lifecycle status. `Running` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Timeout,
    Terminated,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

/// A resolved external tool invocation.
///
/// Keeps both the argument vector used for submission and a human-readable
/// string for display and history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub display: String,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let program = program.into();
        let display = if args.is_empty() {
            program.clone()
        } else {
            format!("{} \\\n  {}", program, args.join(" \\\n  "))
        };
        Self {
            program,
            args,
            display,
        }
    }
}

/// Synchronous acknowledgement returned by submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAck {
    pub execution_id: String,
}

/// One status fetch: current status plus the authoritative full logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusReport {
    pub status: JobStatus,
    #[serde(default)]
    pub stdout: Vec<String>,
    #[serde(default)]
    pub stderr: Vec<String>,
}

/// Entry in the service's execution list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub execution_id: String,
    pub status: JobStatus,
    pub start_time: Option<DateTime<Local>>,
}

/// Contract with the external process-execution service.
///
/// Implementations must never block for process completion: `submit` returns
/// as soon as the service has acknowledged the job.
#[async_trait]
pub trait JobLauncher: Send + Sync {
    async fn submit(&self, spec: &CommandSpec) -> Result<JobAck>;
    async fn status(&self, job_id: &str) -> Result<JobStatusReport>;
    /// Request cancellation. Returns whether the service acknowledged it.
    async fn terminate(&self, job_id: &str) -> Result<bool>;
    async fn list(&self) -> Result<Vec<JobSummary>>;
    async fn health(&self) -> Result<bool>;
}

#[derive(Debug, Deserialize)]
struct TerminateResponse {
    acknowledged: bool,
}

/// HTTP client for the execution service's REST surface.
pub struct HttpJobLauncher {
    base_url: String,
    client: reqwest::Client,
}

impl HttpJobLauncher {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl JobLauncher for HttpJobLauncher {
    async fn submit(&self, spec: &CommandSpec) -> Result<JobAck> {
        let resp = self
            .client
            .post(self.url("/api/execute"))
            .json(spec)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    async fn status(&self, job_id: &str) -> Result<JobStatusReport> {
        let resp = self
            .client
            .get(self.url(&format!("/api/status/{}", job_id)))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    async fn terminate(&self, job_id: &str) -> Result<bool> {
        let resp = self
            .client
            .post(self.url(&format!("/api/terminate/{}", job_id)))
            .send()
            .await?
            .error_for_status()?;
        let body: TerminateResponse = resp.json().await?;
        Ok(body.acknowledged)
    }

    async fn list(&self) -> Result<Vec<JobSummary>> {
        let resp = self
            .client
            .get(self.url("/api/list"))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    async fn health(&self) -> Result<bool> {
        let resp = self
            .client
            .get(self.url("/api/health"))
            .send()
            .await
            .map_err(|e| anyhow!("Execution service unreachable: {}", e))?;
        Ok(resp.status().is_success())
    }
}
