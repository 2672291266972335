//! Event sources backed by local data, and the shared payload decoder.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use schedule_core::{EventSource, NormalizedEvent, SourceError, StoreFuture};
use serde::Deserialize;
use serde_json::Value;

/// One entry of a timetable export, before validation.
#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    summary: String,
    start: Option<DateTime<FixedOffset>>,
    end: Option<DateTime<FixedOffset>>,
    location: Option<String>,
    #[serde(default)]
    teacher: String,
    group: Option<String>,
    #[serde(default)]
    discipline: String,
}

impl RawEvent {
    /// Only classes count: entries without a discipline are calendar metadata.
    fn into_event(self) -> Option<NormalizedEvent> {
        if self.discipline.trim().is_empty() {
            return None;
        }
        Some(NormalizedEvent {
            summary: self.summary,
            start: self.start?,
            end: self.end?,
            location: self.location?,
            teacher: self.teacher,
            group: self.group?,
            discipline: self.discipline,
        })
    }
}

/// Decode a JSON array of timetable entries, dropping malformed ones.
pub fn parse_events(payload: &str) -> Result<Vec<NormalizedEvent>, SourceError> {
    let entries: Vec<Value> =
        serde_json::from_str(payload).map_err(|e| SourceError::Parse(e.to_string()))?;

    let total = entries.len();
    let events: Vec<NormalizedEvent> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<RawEvent>(entry).ok())
        .filter_map(RawEvent::into_event)
        .collect();

    if events.len() < total {
        tracing::debug!("Dropped {} of {} timetable entries", total - events.len(), total);
    }
    Ok(events)
}

/// Reads events from a JSON file on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileEventSource {
    path: PathBuf,
}

impl JsonFileEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl EventSource for JsonFileEventSource {
    fn fetch(&self) -> StoreFuture<'_, Result<Vec<NormalizedEvent>, SourceError>> {
        Box::pin(async move {
            let payload = tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| SourceError::Fetch(format!("{}: {}", self.path.display(), e)))?;
            parse_events(&payload)
        })
    }
}

/// Serves a fixed list of events.
#[derive(Debug, Clone, Default)]
pub struct StaticEventSource {
    events: Vec<NormalizedEvent>,
}

impl StaticEventSource {
    pub fn new(events: Vec<NormalizedEvent>) -> Self {
        Self { events }
    }
}

impl EventSource for StaticEventSource {
    fn fetch(&self) -> StoreFuture<'_, Result<Vec<NormalizedEvent>, SourceError>> {
        Box::pin(async move { Ok(self.events.clone()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_complete_classes() {
        let payload = r#"[
            {"summary": "Physics", "start": "2025-03-03T09:00:00+03:00", "end": "2025-03-03T10:30:00+03:00",
             "location": "A-101", "teacher": "Ivanov", "group": "IKBO-01", "discipline": "Physics"},
            {"summary": "Semester start", "start": "2025-02-10T00:00:00+03:00", "end": "2025-02-10T00:00:00+03:00",
             "location": "", "group": "IKBO-01", "discipline": ""},
            {"summary": "No room", "start": "2025-03-03T11:00:00+03:00", "end": "2025-03-03T12:30:00+03:00",
             "group": "IKBO-01", "discipline": "Math"},
            {"summary": "Bad time", "start": "tomorrow", "end": "2025-03-03T12:30:00+03:00",
             "location": "A-101", "group": "IKBO-01", "discipline": "Math"}
        ]"#;

        let events = parse_events(payload).unwrap_or_default();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].location, "A-101");
        assert_eq!(events[0].group, "IKBO-01");
    }

    #[test]
    fn non_array_payload_is_a_parse_error() {
        let result = parse_events(r#"{"data": []}"#);
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }
}
