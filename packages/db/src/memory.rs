//! In-process store implementations.
//!
//! These back the same traits as the SurrealDB repositories and are shared
//! across callers through `Arc`. Useful for tests and single-process setups.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use schedule_core::{
    ConflictIssue, CoordinationError, CoordinationStore, IssueFilter, JobId, JobRecord, JobStore,
    PersistenceError, ResultStore, StoreFuture,
};

use crate::{expiry_from_now, now_ms};

fn poisoned<T>(_: T) -> CoordinationError {
    CoordinationError::Unavailable("store lock poisoned".into())
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at_ms: i64,
}

impl Entry {
    fn new(value: &str, ttl: Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at_ms: expiry_from_now(ttl),
        }
    }
}

/// Coordination store held in a mutex-guarded map.
#[derive(Debug, Default)]
pub struct MemoryCoordinationStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCoordinationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the map with expired entries already removed.
    fn live(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, CoordinationError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        let now = now_ms();
        entries.retain(|_, e| e.expires_at_ms > now);
        Ok(entries)
    }

    /// Number of live keys.
    pub fn len(&self) -> Result<usize, CoordinationError> {
        Ok(self.live()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CoordinationError> {
        Ok(self.len()? == 0)
    }
}

impl CoordinationStore for MemoryCoordinationStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Result<Option<String>, CoordinationError>> {
        Box::pin(async move { Ok(self.live()?.get(key).map(|e| e.value.clone())) })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, Result<(), CoordinationError>> {
        Box::pin(async move {
            self.live()?.insert(key.to_string(), Entry::new(value, ttl));
            Ok(())
        })
    }

    fn set_if_absent<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, Result<Option<String>, CoordinationError>> {
        Box::pin(async move {
            let mut entries = self.live()?;
            if let Some(existing) = entries.get(key) {
                return Ok(Some(existing.value.clone()));
            }
            entries.insert(key.to_string(), Entry::new(value, ttl));
            Ok(None)
        })
    }

    fn compare_and_set<'a>(
        &'a self,
        key: &'a str,
        expected: &'a str,
        value: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, Result<bool, CoordinationError>> {
        Box::pin(async move {
            let mut entries = self.live()?;
            match entries.get_mut(key) {
                Some(entry) if entry.value == expected => {
                    *entry = Entry::new(value, ttl);
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Result<(), CoordinationError>> {
        Box::pin(async move {
            self.live()?.remove(key);
            Ok(())
        })
    }

    fn delete_if_equals<'a>(
        &'a self,
        key: &'a str,
        expected: &'a str,
    ) -> StoreFuture<'a, Result<bool, CoordinationError>> {
        Box::pin(async move {
            let mut entries = self.live()?;
            if entries.get(key).is_some_and(|e| e.value == expected) {
                entries.remove(key);
                return Ok(true);
            }
            Ok(false)
        })
    }
}

/// Job records held in memory with per-record expiry.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<JobId, (JobRecord, i64)>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn save<'a>(
        &'a self,
        record: &'a JobRecord,
        ttl: Duration,
    ) -> StoreFuture<'a, Result<(), CoordinationError>> {
        Box::pin(async move {
            self.jobs
                .lock()
                .map_err(poisoned)?
                .insert(record.job_id, (record.clone(), expiry_from_now(ttl)));
            Ok(())
        })
    }

    fn get<'a>(&'a self, job_id: &'a JobId) -> StoreFuture<'a, Result<Option<JobRecord>, CoordinationError>> {
        Box::pin(async move {
            let jobs = self.jobs.lock().map_err(poisoned)?;
            let now = now_ms();
            Ok(jobs
                .get(job_id)
                .filter(|(_, expires_at_ms)| *expires_at_ms > now)
                .map(|(record, _)| record.clone()))
        })
    }

    fn delete<'a>(&'a self, job_id: &'a JobId) -> StoreFuture<'a, Result<(), CoordinationError>> {
        Box::pin(async move {
            self.jobs.lock().map_err(poisoned)?.remove(job_id);
            Ok(())
        })
    }

    fn purge_expired(&self) -> StoreFuture<'_, Result<usize, CoordinationError>> {
        Box::pin(async move {
            let mut jobs = self.jobs.lock().map_err(poisoned)?;
            let before = jobs.len();
            let now = now_ms();
            jobs.retain(|_, (_, expires_at_ms)| *expires_at_ms > now);
            Ok(before - jobs.len())
        })
    }
}

/// Issue set swapped wholesale under a write lock.
///
/// Readers always observe one complete generation.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    issues: RwLock<Vec<ConflictIssue>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `issues`.
    pub fn with_issues(issues: Vec<ConflictIssue>) -> Self {
        Self {
            issues: RwLock::new(issues),
        }
    }
}

fn read_poisoned<T>(_: T) -> PersistenceError {
    PersistenceError::Read("store lock poisoned".into())
}

impl ResultStore for MemoryResultStore {
    fn replace_all(&self, issues: Vec<ConflictIssue>) -> StoreFuture<'_, Result<(), PersistenceError>> {
        Box::pin(async move {
            let mut current = self
                .issues
                .write()
                .map_err(|_| PersistenceError::Write("store lock poisoned".into()))?;
            *current = issues;
            Ok(())
        })
    }

    fn list<'a>(
        &'a self,
        filter: &'a IssueFilter,
    ) -> StoreFuture<'a, Result<Vec<ConflictIssue>, PersistenceError>> {
        Box::pin(async move {
            let issues = self.issues.read().map_err(read_poisoned)?;
            Ok(issues.iter().filter(|i| filter.matches(i)).cloned().collect())
        })
    }

    fn newest_last_updated(&self) -> StoreFuture<'_, Result<Option<DateTime<Utc>>, PersistenceError>> {
        Box::pin(async move {
            let issues = self.issues.read().map_err(read_poisoned)?;
            Ok(issues.iter().map(|i| i.last_updated).max())
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;
    use chrono::TimeDelta;
    use schedule_core::{Fingerprint, IssueCategory, NormalizedEvent};

    const TTL: Duration = Duration::from_secs(60);

    fn issue(group: &str, updated: DateTime<Utc>) -> ConflictIssue {
        let event = NormalizedEvent {
            summary: "Lecture".into(),
            start: updated.fixed_offset(),
            end: updated.fixed_offset(),
            location: "A-101".into(),
            teacher: "Ivanov".into(),
            group: group.into(),
            discipline: "Physics".into(),
        };
        ConflictIssue {
            category: IssueCategory::LongGap,
            first_event: event.clone(),
            second_event: event,
            description: "Gap between classes: 2:30:00".into(),
            detected_at: updated,
            last_updated: updated,
        }
    }

    #[tokio::test]
    async fn coordination_claims_are_exclusive() {
        let store = MemoryCoordinationStore::new();
        assert_eq!(store.set_if_absent("k", "a", TTL).await.unwrap(), None);
        assert_eq!(
            store.set_if_absent("k", "b", TTL).await.unwrap(),
            Some("a".to_string())
        );
        assert!(!store.compare_and_set("k", "b", "c", TTL).await.unwrap());
        assert!(store.compare_and_set("k", "a", "c", TTL).await.unwrap());
        assert!(!store.delete_if_equals("k", "a").await.unwrap());
        assert!(store.delete_if_equals("k", "c").await.unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn coordination_entries_expire() {
        let store = MemoryCoordinationStore::new();
        store.set("k", "a", Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.set_if_absent("k", "b", TTL).await.unwrap(), None);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn poisoned_coordination_store_reports_an_error() {
        let store = std::sync::Arc::new(MemoryCoordinationStore::new());
        let holder = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.entries.lock().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(matches!(store.len(), Err(CoordinationError::Unavailable(_))));
        assert!(store.is_empty().is_err());
    }

    #[tokio::test]
    async fn job_records_expire_and_purge() {
        let jobs = MemoryJobStore::new();
        let kept = JobRecord::pending(JobId::new(), Fingerprint("a".into()));
        let gone = JobRecord::pending(JobId::new(), Fingerprint("b".into()));
        jobs.save(&kept, TTL).await.unwrap();
        jobs.save(&gone, Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(jobs.get(&gone.job_id).await.unwrap().is_none());
        assert!(jobs.get(&kept.job_id).await.unwrap().is_some());
        assert_eq!(jobs.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn result_store_swaps_and_reports_newest() {
        let now = Utc::now();
        let store = MemoryResultStore::with_issues(vec![issue("IKBO-01", now - TimeDelta::hours(2))]);
        store
            .replace_all(vec![issue("IKBO-01", now), issue("INBO-02", now)])
            .await
            .unwrap();

        assert_eq!(store.newest_last_updated().await.unwrap(), Some(now));
        let filter = IssueFilter::default().with_group("inbo");
        assert_eq!(store.list(&filter).await.unwrap().len(), 1);

        store.replace_all(Vec::new()).await.unwrap();
        assert_eq!(store.newest_last_updated().await.unwrap(), None);
    }
}
