//! Job record repository.

use std::time::Duration;

use schedule_core::{CoordinationError, JobId, JobRecord, JobStore, StoreFuture};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::{Database, DbError, expiry_from_now, now_ms};

/// Repository for refresh job records.
#[derive(Clone)]
pub struct JobRepository {
    db: Database,
}

/// Internal record type for SurrealDB.
#[derive(Debug, Serialize, Deserialize)]
struct StoredJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    #[serde(flatten)]
    record: JobRecord,
    expires_at_ms: i64,
}

impl JobRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert or replace a job record with a fresh expiry.
    pub async fn upsert(&self, record: &JobRecord, ttl: Duration) -> Result<JobRecord, DbError> {
        let stored = StoredJob {
            id: None,
            record: record.clone(),
            expires_at_ms: expiry_from_now(ttl),
        };

        let saved: Option<StoredJob> = self
            .db
            .upsert(("job", record.job_id.to_string()))
            .content(stored)
            .await?;

        saved
            .map(|s| s.record)
            .ok_or_else(|| DbError::Query(format!("Failed to save job {}", record.job_id)))
    }

    /// Get a live job record by ID.
    pub async fn get(&self, id: JobId) -> Result<JobRecord, DbError> {
        let stored: Option<StoredJob> = self.db.select(("job", id.to_string())).await?;

        stored
            .filter(|s| s.expires_at_ms > now_ms())
            .map(|s| s.record)
            .ok_or_else(|| DbError::NotFound(format!("Job not found: {}", id)))
    }

    /// Live jobs admitted for a fingerprint, newest first.
    pub async fn list_for_fingerprint(&self, fingerprint: &str) -> Result<Vec<JobRecord>, DbError> {
        let mut response = self
            .db
            .query(
                r#"
                SELECT * FROM job
                WHERE fingerprint = $fingerprint AND expires_at_ms > $now
                ORDER BY job_id DESC
                "#,
            )
            .bind(("fingerprint", fingerprint.to_string()))
            .bind(("now", now_ms()))
            .await?;

        let stored: Vec<StoredJob> = response.take(0)?;
        Ok(stored.into_iter().map(|s| s.record).collect())
    }

    /// Delete a job record.
    pub async fn delete(&self, id: JobId) -> Result<(), DbError> {
        let _: Option<StoredJob> = self.db.delete(("job", id.to_string())).await?;
        Ok(())
    }

    /// Remove every expired job record.
    pub async fn purge_expired(&self) -> Result<usize, DbError> {
        let mut response = self
            .db
            .query("DELETE job WHERE expires_at_ms <= $now RETURN BEFORE")
            .bind(("now", now_ms()))
            .await?;

        let purged: Vec<StoredJob> = response.take(0)?;
        if !purged.is_empty() {
            tracing::debug!("Purged {} expired job records", purged.len());
        }
        Ok(purged.len())
    }
}

fn unavailable(err: DbError) -> CoordinationError {
    CoordinationError::Unavailable(err.to_string())
}

impl JobStore for JobRepository {
    fn save<'a>(
        &'a self,
        record: &'a JobRecord,
        ttl: Duration,
    ) -> StoreFuture<'a, Result<(), CoordinationError>> {
        Box::pin(async move {
            self.upsert(record, ttl).await.map(|_| ()).map_err(unavailable)
        })
    }

    fn get<'a>(&'a self, job_id: &'a JobId) -> StoreFuture<'a, Result<Option<JobRecord>, CoordinationError>> {
        Box::pin(async move {
            match JobRepository::get(self, *job_id).await {
                Ok(record) => Ok(Some(record)),
                Err(DbError::NotFound(_)) => Ok(None),
                Err(err) => Err(unavailable(err)),
            }
        })
    }

    fn delete<'a>(&'a self, job_id: &'a JobId) -> StoreFuture<'a, Result<(), CoordinationError>> {
        Box::pin(async move { JobRepository::delete(self, *job_id).await.map_err(unavailable) })
    }

    fn purge_expired(&self) -> StoreFuture<'_, Result<usize, CoordinationError>> {
        Box::pin(async move { JobRepository::purge_expired(self).await.map_err(unavailable) })
    }
}
