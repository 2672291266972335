#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use schedule_core::{
    ConflictIssue, EventSource, IssueCategory, JobEvent, JobId, NormalizedEvent, SourceError,
    StoreFuture,
};
use tokio::sync::{Notify, broadcast};

pub fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3 * 3600)
        .and_then(|tz| tz.with_ymd_and_hms(2025, 3, 3, hour, minute, 0).single())
        .unwrap_or_default()
}

pub fn event(group: &str, start: (u32, u32), end: (u32, u32), room: &str) -> NormalizedEvent {
    NormalizedEvent {
        summary: format!("Lecture {}:{:02}", start.0, start.1),
        start: at(start.0, start.1),
        end: at(end.0, end.1),
        location: room.to_string(),
        teacher: "Petrov P.P.".to_string(),
        group: group.to_string(),
        discipline: "Mathematics".to_string(),
    }
}

/// One long gap in IKBO-01 and one impossible transition in INBO-02.
pub fn timetable() -> Vec<NormalizedEvent> {
    vec![
        event("IKBO-01", (9, 0), (10, 30), "A-101"),
        event("IKBO-01", (13, 0), (14, 30), "A-101"),
        event("INBO-02", (9, 0), (10, 0), "A-101"),
        event("INBO-02", (10, 5), (11, 0), "B-202"),
    ]
}

/// An issue last refreshed `age` ago.
pub fn stored_issue(description: &str, age: chrono::TimeDelta) -> ConflictIssue {
    let updated = Utc::now() - age;
    ConflictIssue {
        category: IssueCategory::LongGap,
        first_event: event("IKBO-01", (9, 0), (10, 30), "A-101"),
        second_event: event("IKBO-01", (13, 0), (14, 30), "A-101"),
        description: description.to_string(),
        detected_at: updated,
        last_updated: updated,
    }
}

/// Source with a fetch counter and an optional gate.
pub struct TestSource {
    events: Result<Vec<NormalizedEvent>, SourceError>,
    gate: Option<Arc<Notify>>,
    pub fetches: AtomicUsize,
}

impl TestSource {
    pub fn new(events: Vec<NormalizedEvent>) -> Self {
        Self {
            events: Ok(events),
            gate: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            events: Err(SourceError::Fetch("schedule API returned 503".into())),
            gate: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Hold every fetch until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl EventSource for TestSource {
    fn fetch(&self) -> StoreFuture<'_, Result<Vec<NormalizedEvent>, SourceError>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.events.clone()
        })
    }
}

/// Wait until `job_id` reaches a terminal event.
pub async fn wait_for_job(
    rx: &mut broadcast::Receiver<JobEvent>,
    job_id: JobId,
) -> Result<JobEvent, Box<dyn std::error::Error>> {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await??;
        if event.job_id() == job_id
            && matches!(event, JobEvent::JobSucceeded { .. } | JobEvent::JobFailed { .. })
        {
            return Ok(event);
        }
    }
}
