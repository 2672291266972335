//! Request and response shapes of the service surface.

use chrono::{DateTime, FixedOffset, Utc};
use schedule_core::{Admission, ConflictIssue, JobRecord, JobState, NormalizedEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Query parameters accepted when listing or processing issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueQuery {
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub teacher: Option<String>,
}

impl From<IssueQuery> for schedule_core::IssueFilter {
    fn from(query: IssueQuery) -> Self {
        schedule_core::IssueFilter::new(query.group, query.teacher)
    }
}

/// Event as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    pub summary: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub location: String,
    pub teacher: String,
    pub group: String,
    pub discipline: String,
}

impl From<NormalizedEvent> for EventView {
    fn from(event: NormalizedEvent) -> Self {
        Self {
            summary: event.summary,
            start_time: event.start,
            end_time: event.end,
            location: event.location,
            teacher: event.teacher,
            group: event.group,
            discipline: event.discipline,
        }
    }
}

/// Issue as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueView {
    pub issue_type: String,
    pub description: String,
    pub detected_at: DateTime<Utc>,
    pub related_event: EventView,
    pub related_event_2: EventView,
}

impl From<ConflictIssue> for IssueView {
    fn from(issue: ConflictIssue) -> Self {
        Self {
            issue_type: issue.category.label().to_string(),
            description: issue.description,
            detected_at: issue.detected_at,
            related_event: issue.first_event.into(),
            related_event_2: issue.second_event.into(),
        }
    }
}

/// Task status names reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Not started, or unknown to the service.
    Pending,
    Started,
    /// Joined a task already in flight.
    InQueue,
    Success,
    Failure,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Started => "STARTED",
            TaskStatus::InQueue => "IN_QUEUE",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failure => "FAILURE",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<JobState> for TaskStatus {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Pending => TaskStatus::Pending,
            JobState::Running => TaskStatus::Started,
            JobState::Succeeded => TaskStatus::Success,
            JobState::Failed => TaskStatus::Failure,
        }
    }
}

/// Reply to a processing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub task_id: String,
    pub status: TaskStatus,
}

impl From<Admission> for ProcessResponse {
    fn from(admission: Admission) -> Self {
        let status = match admission {
            Admission::Started(_) => TaskStatus::Started,
            Admission::Duplicate(_) => TaskStatus::InQueue,
        };
        Self {
            task_id: admission.job_id().to_string(),
            status,
        }
    }
}

/// Reply to a task status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub task_id: String,
    pub status: TaskStatus,
    /// Outcome output on success, error text on failure.
    pub result: Option<JsonValue>,
}

impl TaskStatusResponse {
    /// Status of a task the service has no record of.
    pub fn pending(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Pending,
            result: None,
        }
    }
}

impl From<JobRecord> for TaskStatusResponse {
    fn from(record: JobRecord) -> Self {
        let result = match record.state {
            JobState::Succeeded => record.outcome.and_then(|o| o.output),
            JobState::Failed => record.error.map(JsonValue::String),
            JobState::Pending | JobState::Running => None,
        };
        Self {
            task_id: record.job_id.to_string(),
            status: record.state.into(),
            result,
        }
    }
}
