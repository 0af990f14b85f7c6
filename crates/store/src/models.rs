use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a processing trigger came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    /// Direct API call (`POST /api/job`).
    Direct,
    /// Inbound platform webhook.
    Event,
    /// Operator re-run.
    Manual,
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerSource::Direct => write!(f, "direct"),
            TriggerSource::Event => write!(f, "event"),
            TriggerSource::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
    /// Terminal state for recordings with nothing to process
    /// (no audio tracks).
    Skipped,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Durable per-job record exposed to external pollers.
///
/// Written only by the lock holder: created at sequence start
/// (`processing`), overwritten once at the terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub job_id: String,
    pub recording_path: String,
    pub trigger_source: TriggerSource,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    /// Failing stage's error kind + message, verbatim.
    pub error: Option<String>,
}

impl StatusRecord {
    pub fn processing(
        job_id: impl Into<String>,
        recording_path: impl Into<String>,
        trigger_source: TriggerSource,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            recording_path: recording_path.into(),
            trigger_source,
            status: JobStatus::Processing,
            started_at: Utc::now(),
            completed_at: None,
            exit_code: None,
            error: None,
        }
    }

    pub fn finish(mut self, status: JobStatus, exit_code: i32, error: Option<String>) -> Self {
        self.status = status;
        self.completed_at = Some(Utc::now());
        self.exit_code = Some(exit_code);
        self.error = error;
        self
    }
}
