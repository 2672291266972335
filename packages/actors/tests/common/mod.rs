#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use schedule_core::{
    ConflictIssue, EventSource, NormalizedEvent, PersistenceError, ResultStore, SourceError,
    StoreFuture, IssueFilter,
};
use tokio::sync::Notify;

use actors::{JobCoordinator, JobRunner};
use db::memory::{MemoryCoordinationStore, MemoryJobStore, MemoryResultStore};

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
        teacher: "Ivanov I.I.".to_string(),
        group: group.to_string(),
        discipline: "Physics".to_string(),
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

/// Source returning a fixed event list and counting fetches.
pub struct StaticSource {
    events: Vec<NormalizedEvent>,
    pub fetches: AtomicUsize,
}

impl StaticSource {
    pub fn new(events: Vec<NormalizedEvent>) -> Self {
        Self {
            events,
            fetches: AtomicUsize::new(0),
        }
    }
}

impl EventSource for StaticSource {
    fn fetch(&self) -> StoreFuture<'_, Result<Vec<NormalizedEvent>, SourceError>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.events.clone())
        })
    }
}

/// Source that always fails to fetch.
pub struct FailingSource;

impl EventSource for FailingSource {
    fn fetch(&self) -> StoreFuture<'_, Result<Vec<NormalizedEvent>, SourceError>> {
        Box::pin(async { Err(SourceError::Fetch("connection refused".into())) })
    }
}

/// Source that panics mid-fetch.
pub struct PanickingSource;

impl EventSource for PanickingSource {
    fn fetch(&self) -> StoreFuture<'_, Result<Vec<NormalizedEvent>, SourceError>> {
        Box::pin(async {
            let events: Vec<NormalizedEvent> = Vec::new();
            if events.is_empty() {
                panic!("feed decoder exploded");
            }
            Ok(events)
        })
    }
}

/// Source that blocks until the test opens the gate.
pub struct GatedSource {
    events: Vec<NormalizedEvent>,
    pub entered: Arc<Notify>,
    pub gate: Arc<Notify>,
}

impl GatedSource {
    pub fn new(events: Vec<NormalizedEvent>) -> Self {
        Self {
            events,
            entered: Arc::new(Notify::new()),
            gate: Arc::new(Notify::new()),
        }
    }
}

impl EventSource for GatedSource {
    fn fetch(&self) -> StoreFuture<'_, Result<Vec<NormalizedEvent>, SourceError>> {
        Box::pin(async move {
            self.entered.notify_one();
            self.gate.notified().await;
            Ok(self.events.clone())
        })
    }
}

/// Result store whose writes always fail.
pub struct FailingResultStore;

impl ResultStore for FailingResultStore {
    fn replace_all(&self, _issues: Vec<ConflictIssue>) -> StoreFuture<'_, Result<(), PersistenceError>> {
        Box::pin(async { Err(PersistenceError::Write("disk full".into())) })
    }

    fn list<'a>(
        &'a self,
        _filter: &'a IssueFilter,
    ) -> StoreFuture<'a, Result<Vec<ConflictIssue>, PersistenceError>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn newest_last_updated(&self) -> StoreFuture<'_, Result<Option<DateTime<Utc>>, PersistenceError>> {
        Box::pin(async { Ok(None) })
    }
}

/// Memory-backed stores shared by a test.
pub struct Harness {
    pub coordination: Arc<MemoryCoordinationStore>,
    pub jobs: Arc<MemoryJobStore>,
    pub results: Arc<MemoryResultStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            coordination: Arc::new(MemoryCoordinationStore::new()),
            jobs: Arc::new(MemoryJobStore::new()),
            results: Arc::new(MemoryResultStore::new()),
        }
    }

    pub fn coordinator(&self) -> JobCoordinator {
        JobCoordinator::new(self.coordination.clone(), self.jobs.clone())
            .with_ttl(Duration::from_secs(60))
    }

    pub fn runner(&self, source: Arc<dyn EventSource>) -> JobRunner {
        JobRunner::new(self.coordinator(), source, self.results.clone())
    }

    pub fn runner_with_results(
        &self,
        source: Arc<dyn EventSource>,
        results: Arc<dyn ResultStore>,
    ) -> JobRunner {
        JobRunner::new(self.coordinator(), source, results)
    }
}
