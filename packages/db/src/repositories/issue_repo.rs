//! Issue repository: the persisted result set.

use chrono::{DateTime, Utc};
use schedule_core::{
    ConflictIssue, IssueCategory, IssueFilter, NormalizedEvent, PersistenceError, ResultStore,
    StoreFuture,
};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;
use ulid::Ulid;

use crate::{Database, DbError};

/// Longest text stored for any issue or event field.
pub const MAX_FIELD_LEN: usize = 255;

/// Repository for the current issue set.
///
/// Rows written by one `replace_all` share a generation id. The insert of the
/// new generation and the delete of every other generation run in a single
/// transaction, so readers see either the old set or the new one.
#[derive(Clone)]
pub struct IssueRepository {
    db: Database,
}

/// Internal record type for SurrealDB.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IssueRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    generation: String,
    seq: u64,
    category: IssueCategory,
    first_event: NormalizedEvent,
    second_event: NormalizedEvent,
    description: String,
    detected_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    last_updated_ms: i64,
}

impl IssueRecord {
    fn new(generation: &str, seq: u64, issue: ConflictIssue) -> Self {
        Self {
            id: None,
            generation: generation.to_string(),
            seq,
            category: issue.category,
            first_event: truncate_event(issue.first_event),
            second_event: truncate_event(issue.second_event),
            description: truncate_text(issue.description),
            detected_at: issue.detected_at,
            last_updated: issue.last_updated,
            last_updated_ms: issue.last_updated.timestamp_millis(),
        }
    }

    fn into_issue(self) -> ConflictIssue {
        ConflictIssue {
            category: self.category,
            first_event: self.first_event,
            second_event: self.second_event,
            description: self.description,
            detected_at: self.detected_at,
            last_updated: self.last_updated,
        }
    }
}

/// Cut `text` to [`MAX_FIELD_LEN`] characters.
pub fn truncate_text(text: String) -> String {
    match text.char_indices().nth(MAX_FIELD_LEN) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}

fn truncate_event(event: NormalizedEvent) -> NormalizedEvent {
    NormalizedEvent {
        summary: truncate_text(event.summary),
        location: truncate_text(event.location),
        teacher: truncate_text(event.teacher),
        group: truncate_text(event.group),
        discipline: truncate_text(event.discipline),
        ..event
    }
}

impl IssueRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Swap the stored issue set for `issues`.
    pub async fn replace(&self, issues: Vec<ConflictIssue>) -> Result<(), DbError> {
        let generation = Ulid::new().to_string();
        let count = issues.len();
        let rows: Vec<IssueRecord> = issues
            .into_iter()
            .enumerate()
            .map(|(seq, issue)| IssueRecord::new(&generation, seq as u64, issue))
            .collect();

        let query = if rows.is_empty() {
            r#"
            BEGIN TRANSACTION;
            DELETE issue WHERE generation != $generation;
            COMMIT TRANSACTION;
            "#
        } else {
            r#"
            BEGIN TRANSACTION;
            INSERT INTO issue $rows;
            DELETE issue WHERE generation != $generation;
            COMMIT TRANSACTION;
            "#
        };

        self.db
            .query(query)
            .bind(("rows", rows))
            .bind(("generation", generation.clone()))
            .await?
            .check()?;

        tracing::debug!("Stored issue generation {} ({} issues)", generation, count);
        Ok(())
    }

    /// List stored issues in detection order.
    pub async fn list(&self, filter: &IssueFilter) -> Result<Vec<ConflictIssue>, DbError> {
        let mut response = self
            .db
            .query("SELECT * FROM issue ORDER BY seq ASC")
            .await?;

        let records: Vec<IssueRecord> = response.take(0)?;

        Ok(records
            .into_iter()
            .map(IssueRecord::into_issue)
            .filter(|issue| filter.matches(issue))
            .collect())
    }

    /// Count stored issues.
    pub async fn count(&self) -> Result<usize, DbError> {
        #[derive(Deserialize)]
        struct Count {
            count: i64,
        }

        let mut response = self
            .db
            .query("SELECT count() AS count FROM issue GROUP ALL")
            .await?;

        let counts: Vec<Count> = response.take(0)?;
        Ok(counts.first().map_or(0, |c| c.count as usize))
    }

    /// Timestamp of the most recently updated issue.
    pub async fn newest_last_updated(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        #[derive(Deserialize)]
        struct Newest {
            last_updated_ms: i64,
        }

        let mut response = self
            .db
            .query("SELECT last_updated_ms FROM issue ORDER BY last_updated_ms DESC LIMIT 1")
            .await?;

        let newest: Vec<Newest> = response.take(0)?;
        Ok(newest
            .first()
            .and_then(|n| DateTime::from_timestamp_millis(n.last_updated_ms)))
    }
}

impl ResultStore for IssueRepository {
    fn replace_all(&self, issues: Vec<ConflictIssue>) -> StoreFuture<'_, Result<(), PersistenceError>> {
        Box::pin(async move {
            self.replace(issues)
                .await
                .map_err(|e| PersistenceError::Write(e.to_string()))
        })
    }

    fn list<'a>(
        &'a self,
        filter: &'a IssueFilter,
    ) -> StoreFuture<'a, Result<Vec<ConflictIssue>, PersistenceError>> {
        Box::pin(async move {
            IssueRepository::list(self, filter)
                .await
                .map_err(|e| PersistenceError::Read(e.to_string()))
        })
    }

    fn newest_last_updated(&self) -> StoreFuture<'_, Result<Option<DateTime<Utc>>, PersistenceError>> {
        Box::pin(async move {
            IssueRepository::newest_last_updated(self)
                .await
                .map_err(|e| PersistenceError::Read(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_text("A-101".to_string()), "A-101");
    }

    #[test]
    fn long_text_is_cut_on_char_boundary() {
        let text = "ж".repeat(300);
        let cut = truncate_text(text);
        assert_eq!(cut.chars().count(), MAX_FIELD_LEN);
    }
}
