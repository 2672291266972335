//! Collaborator traits for the refresh pipeline.
//!
//! All methods return boxed futures so the traits stay object safe and can be
//! shared as `Arc<dyn Trait>` between the coordinator, the runner and the
//! read path.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{
    ConflictIssue, CoordinationError, IssueFilter, JobId, JobRecord, NormalizedEvent,
    PersistenceError, SourceError,
};

/// Future type returned by store and source methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Supplier of normalized timetable events.
///
/// Implementations drop malformed entries themselves; everything they yield
/// must be a complete event.
pub trait EventSource: Send + Sync + 'static {
    fn fetch(&self) -> StoreFuture<'_, Result<Vec<NormalizedEvent>, SourceError>>;
}

/// Shared key-value store backing admission control.
///
/// Each method is atomic on its own key. No multi-key transactions are
/// assumed. Expired entries behave as absent on every operation.
pub trait CoordinationStore: Send + Sync + 'static {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Result<Option<String>, CoordinationError>>;

    /// Unconditionally store `value` under `key` for `ttl`.
    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, Result<(), CoordinationError>>;

    /// Store `value` unless a live entry exists.
    ///
    /// Returns `None` when the value was written, or the value currently held.
    fn set_if_absent<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, Result<Option<String>, CoordinationError>>;

    /// Replace the live entry only if it still holds `expected`.
    fn compare_and_set<'a>(
        &'a self,
        key: &'a str,
        expected: &'a str,
        value: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, Result<bool, CoordinationError>>;

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Result<(), CoordinationError>>;

    /// Delete the entry only if it holds `expected`. Returns whether it did.
    fn delete_if_equals<'a>(
        &'a self,
        key: &'a str,
        expected: &'a str,
    ) -> StoreFuture<'a, Result<bool, CoordinationError>>;
}

/// Storage for [`JobRecord`]s, each kept for a limited time.
pub trait JobStore: Send + Sync + 'static {
    /// Insert or overwrite a record, resetting its expiry to `ttl`.
    fn save<'a>(
        &'a self,
        record: &'a JobRecord,
        ttl: Duration,
    ) -> StoreFuture<'a, Result<(), CoordinationError>>;

    /// Fetch a live record; expired records are reported as `None`.
    fn get<'a>(&'a self, job_id: &'a JobId) -> StoreFuture<'a, Result<Option<JobRecord>, CoordinationError>>;

    fn delete<'a>(&'a self, job_id: &'a JobId) -> StoreFuture<'a, Result<(), CoordinationError>>;

    /// Drop expired records and return how many were removed.
    fn purge_expired(&self) -> StoreFuture<'_, Result<usize, CoordinationError>>;
}

/// Holder of the current issue set.
pub trait ResultStore: Send + Sync + 'static {
    /// Replace the whole issue set.
    ///
    /// New issues are written before old ones are removed, so no reader ever
    /// observes an empty window. On failure the previous set stays intact.
    fn replace_all(&self, issues: Vec<ConflictIssue>) -> StoreFuture<'_, Result<(), PersistenceError>>;

    /// Stored issues matching `filter`, in detection order.
    fn list<'a>(
        &'a self,
        filter: &'a IssueFilter,
    ) -> StoreFuture<'a, Result<Vec<ConflictIssue>, PersistenceError>>;

    /// `last_updated` of the newest stored issue, `None` when empty.
    fn newest_last_updated(&self) -> StoreFuture<'_, Result<Option<DateTime<Utc>>, PersistenceError>>;
}
