//! Refresh job records and admission results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::Fingerprint;

/// Unique identifier for a refresh job, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a refresh job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Admitted, not yet started.
    #[default]
    Pending,
    /// Fetching, analyzing or persisting.
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Human-readable summary of the result.
    pub summary: String,
    /// Structured output, the issues matching the job's filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

impl JobOutcome {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            output: None,
        }
    }

    pub fn with_output(summary: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            summary: summary.into(),
            output: Some(output),
        }
    }
}

/// Tracking record for one admitted refresh job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    /// Fingerprint of the filter the job was admitted for.
    pub fingerprint: Fingerprint,
    pub state: JobState,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<JobOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    /// Create a pending record for a newly admitted job.
    pub fn pending(job_id: JobId, fingerprint: Fingerprint) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            fingerprint,
            state: JobState::Pending,
            started_at: now,
            updated_at: now,
            outcome: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = JobState::Running;
        self.updated_at = Utc::now();
    }

    pub fn mark_succeeded(&mut self, outcome: JobOutcome) {
        self.state = JobState::Succeeded;
        self.outcome = Some(outcome);
        self.error = None;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.state = JobState::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }
}

/// Proof of a successful admission; must be handed back to `release`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionTicket {
    pub job_id: JobId,
    pub fingerprint: Fingerprint,
}

/// Outcome of asking the coordinator to admit a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// A new job was admitted; the caller owns its execution.
    Started(AdmissionTicket),
    /// A job for the same fingerprint is already in flight.
    Duplicate(JobId),
}

impl Admission {
    pub fn job_id(&self) -> JobId {
        match self {
            Admission::Started(ticket) => ticket.job_id,
            Admission::Duplicate(job_id) => *job_id,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, Admission::Started(_))
    }
}
