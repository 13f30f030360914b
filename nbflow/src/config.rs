//! Runtime settings
//!
//! Loaded from an optional YAML file in the platform config dir, then
//! overridden by `NBFLOW_*` environment variables. Missing fields fall back
//! to the defaults below.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::tracker::TrackerConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the execution service.
    pub service_url: String,
    /// Interval between status polls for a running job, in milliseconds.
    pub poll_interval_ms: u64,
    /// Consecutive poll failures tolerated before a job is marked failed.
    pub max_poll_failures: u32,
    /// Wall-clock budget per job, in seconds.
    pub job_timeout_secs: u64,
    /// Workflow instances kept in the persisted history.
    pub history_limit: usize,
    /// Age in hours past which an in-progress snapshot is not offered for resume.
    pub resume_staleness_hours: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8000".to_string(),
            poll_interval_ms: 2000,
            max_poll_failures: 3,
            job_timeout_secs: 600,
            history_limit: 20,
            resume_staleness_hours: 24,
        }
    }
}

impl Settings {
    /// Settings file (if present) plus environment overrides.
    pub fn load() -> Self {
        let mut settings: Settings = std::fs::read_to_string(crate::utils::settings_file_path())
            .ok()
            .and_then(|content| serde_yaml::from_str(&content).ok())
            .unwrap_or_default();
        settings.apply_env();
        settings
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("NBFLOW_SERVICE_URL") {
            self.service_url = url;
        }
        if let Some(ms) = env_parse("NBFLOW_POLL_INTERVAL_MS") {
            self.poll_interval_ms = ms;
        }
        if let Some(secs) = env_parse("NBFLOW_JOB_TIMEOUT_SECS") {
            self.job_timeout_secs = secs;
        }
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_poll_failures: self.max_poll_failures,
            job_timeout: Duration::from_secs(self.job_timeout_secs),
        }
    }

    pub fn resume_staleness(&self) -> chrono::Duration {
        chrono::Duration::hours(self.resume_staleness_hours)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
