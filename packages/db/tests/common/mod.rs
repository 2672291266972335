#![allow(dead_code)]

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use schedule_core::{ConflictIssue, IssueCategory, NormalizedEvent};
use ulid::Ulid;

use db::{Database, DbConfig, DbError};

/// Fresh in-memory database with the schema applied.
pub async fn setup_db() -> Result<Database, DbError> {
    let config = DbConfig::memory().with_database(format!("test_{}", Ulid::new()));
    db::init(&config).await
}

pub fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3 * 3600)
        .and_then(|tz| tz.with_ymd_and_hms(2025, 3, 3, hour, minute, 0).single())
        .unwrap_or_default()
}

pub fn event(group: &str, teacher: &str, start: (u32, u32), end: (u32, u32), room: &str) -> NormalizedEvent {
    NormalizedEvent {
        summary: format!("Class at {}:{:02}", start.0, start.1),
        start: at(start.0, start.1),
        end: at(end.0, end.1),
        location: room.to_string(),
        teacher: teacher.to_string(),
        group: group.to_string(),
        discipline: "Physics".to_string(),
    }
}

pub fn issue(group: &str, teacher: &str, description: &str, updated: DateTime<Utc>) -> ConflictIssue {
    ConflictIssue {
        category: IssueCategory::LongGap,
        first_event: event(group, teacher, (9, 0), (10, 30), "A-101"),
        second_event: event(group, teacher, (13, 0), (14, 30), "A-101"),
        description: description.to_string(),
        detected_at: updated,
        last_updated: updated,
    }
}
