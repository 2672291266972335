//! Conflict issues and the filters used to query them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::NormalizedEvent;

/// Kind of scheduling problem detected between two adjacent classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// Idle window between classes is longer than allowed.
    LongGap,
    /// Not enough time to move between two different rooms.
    ImpossibleTransition,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::LongGap => "long_gap",
            IssueCategory::ImpossibleTransition => "impossible_transition",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            IssueCategory::LongGap => "Long gap",
            IssueCategory::ImpossibleTransition => "Impossible transition",
        }
    }
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A detected problem referencing snapshots of both events involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictIssue {
    pub category: IssueCategory,
    /// The earlier class of the pair.
    pub first_event: NormalizedEvent,
    /// The class that follows `first_event` in the same group and day.
    pub second_event: NormalizedEvent,
    pub description: String,
    pub detected_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Query parameters narrowing an issue list.
///
/// Both fields match case-insensitively as substrings of the first event's
/// group and teacher. Blank values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
}

impl IssueFilter {
    pub fn new(group: Option<String>, teacher: Option<String>) -> Self {
        Self { group, teacher }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_teacher(mut self, teacher: impl Into<String>) -> Self {
        self.teacher = Some(teacher.into());
        self
    }

    fn normalized(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_lowercase)
    }

    /// Check whether an issue passes this filter.
    pub fn matches(&self, issue: &ConflictIssue) -> bool {
        let contains = |needle: Option<String>, haystack: &str| {
            needle.is_none_or(|n| haystack.to_lowercase().contains(&n))
        };
        contains(Self::normalized(&self.group), &issue.first_event.group)
            && contains(Self::normalized(&self.teacher), &issue.first_event.teacher)
    }

    /// Keep only the issues that match.
    pub fn apply(&self, issues: Vec<ConflictIssue>) -> Vec<ConflictIssue> {
        issues.into_iter().filter(|i| self.matches(i)).collect()
    }

    /// Deterministic fingerprint used to deduplicate refresh requests.
    pub fn fingerprint(&self) -> Fingerprint {
        let canonical = format!(
            "group={}\nteacher={}",
            Self::normalized(&self.group).unwrap_or_default(),
            Self::normalized(&self.teacher).unwrap_or_default(),
        );
        let digest = Sha256::digest(canonical.as_bytes());
        Fingerprint(format!("{digest:x}"))
    }
}

/// SHA-256 hex digest of a normalized [`IssueFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
