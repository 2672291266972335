//! Lifecycle events emitted by the refresh pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Fingerprint, JobId};

/// Events emitted while refresh jobs are admitted, run and released.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    /// A new job was admitted for a fingerprint.
    JobAdmitted {
        job_id: JobId,
        fingerprint: Fingerprint,
        timestamp: DateTime<Utc>,
    },
    /// A request joined a job already in flight.
    JobJoined {
        job_id: JobId,
        fingerprint: Fingerprint,
        timestamp: DateTime<Utc>,
    },
    /// A job started fetching events.
    JobRunning {
        job_id: JobId,
        timestamp: DateTime<Utc>,
    },
    /// The stored issue set was replaced.
    IssuesReplaced {
        job_id: JobId,
        issue_count: usize,
        timestamp: DateTime<Utc>,
    },
    /// A job completed successfully.
    JobSucceeded {
        job_id: JobId,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// A job failed.
    JobFailed {
        job_id: JobId,
        kind: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// Coordination state of a job was released.
    JobReleased {
        job_id: JobId,
        timestamp: DateTime<Utc>,
    },
}

impl JobEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            JobEvent::JobAdmitted { timestamp, .. } => *timestamp,
            JobEvent::JobJoined { timestamp, .. } => *timestamp,
            JobEvent::JobRunning { timestamp, .. } => *timestamp,
            JobEvent::IssuesReplaced { timestamp, .. } => *timestamp,
            JobEvent::JobSucceeded { timestamp, .. } => *timestamp,
            JobEvent::JobFailed { timestamp, .. } => *timestamp,
            JobEvent::JobReleased { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job ID associated with this event.
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::JobAdmitted { job_id, .. } => *job_id,
            JobEvent::JobJoined { job_id, .. } => *job_id,
            JobEvent::JobRunning { job_id, .. } => *job_id,
            JobEvent::IssuesReplaced { job_id, .. } => *job_id,
            JobEvent::JobSucceeded { job_id, .. } => *job_id,
            JobEvent::JobFailed { job_id, .. } => *job_id,
            JobEvent::JobReleased { job_id, .. } => *job_id,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            JobEvent::JobAdmitted {
                job_id,
                fingerprint,
                ..
            } => format!("Job {} admitted for {}", job_id, fingerprint),
            JobEvent::JobJoined {
                job_id,
                fingerprint,
                ..
            } => format!("Joined job {} for {}", job_id, fingerprint),
            JobEvent::JobRunning { job_id, .. } => format!("Job {} running", job_id),
            JobEvent::IssuesReplaced {
                job_id,
                issue_count,
                ..
            } => format!("Job {} stored {} issues", job_id, issue_count),
            JobEvent::JobSucceeded {
                job_id,
                duration_ms,
                ..
            } => format!("Job {} succeeded in {}ms", job_id, duration_ms),
            JobEvent::JobFailed {
                job_id,
                kind,
                error,
                ..
            } => format!("Job {} failed ({}): {}", job_id, kind, error),
            JobEvent::JobReleased { job_id, .. } => format!("Job {} released", job_id),
        }
    }
}
