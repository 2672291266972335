//! Coordination store backed by the `coordination` table.

use std::time::Duration;

use schedule_core::{CoordinationError, CoordinationStore, StoreFuture};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::{Database, DbError, expiry_from_now, now_ms};

/// Key-value entries with expiry, one record per key.
///
/// Every operation touches a single record, which SurrealDB applies
/// atomically; conditional writes are expressed as guarded single statements.
#[derive(Clone)]
pub struct CoordinationRepository {
    db: Database,
}

/// Internal record type for SurrealDB.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CoordinationEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    value: String,
    expires_at_ms: i64,
}

impl CoordinationEntry {
    fn new(value: &str, ttl: Duration) -> Self {
        Self {
            id: None,
            value: value.to_string(),
            expires_at_ms: expiry_from_now(ttl),
        }
    }

    fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at_ms > now_ms
    }
}

impl CoordinationRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get the live value stored under `key`.
    pub async fn get_value(&self, key: &str) -> Result<Option<String>, DbError> {
        let entry: Option<CoordinationEntry> =
            self.db.select(("coordination", key.to_string())).await?;

        Ok(entry.filter(|e| e.is_live(now_ms())).map(|e| e.value))
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub async fn set_value(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DbError> {
        let _: Option<CoordinationEntry> = self
            .db
            .upsert(("coordination", key.to_string()))
            .content(CoordinationEntry::new(value, ttl))
            .await?;

        Ok(())
    }

    /// Create the entry unless a live one exists; returns the live value otherwise.
    pub async fn set_value_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<Option<String>, DbError> {
        // An expired holder must not block the create below.
        self.db
            .query(
                "DELETE coordination WHERE id = type::thing('coordination', $key) AND expires_at_ms <= $now",
            )
            .bind(("key", key.to_string()))
            .bind(("now", now_ms()))
            .await?
            .check()?;

        let created: Result<Option<CoordinationEntry>, surrealdb::Error> = self
            .db
            .create(("coordination", key.to_string()))
            .content(CoordinationEntry::new(value, ttl))
            .await;

        match created {
            Ok(Some(_)) => Ok(None),
            Ok(None) => Err(DbError::Query(format!("Failed to create entry {}", key))),
            // Creation fails when the record exists; report the current holder.
            Err(err) => match self.get_value(key).await? {
                Some(existing) => Ok(Some(existing)),
                None => Err(DbError::Connection(err)),
            },
        }
    }

    /// Overwrite the live entry only while it still holds `expected`.
    pub async fn compare_and_set_value(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, DbError> {
        let mut response = self
            .db
            .query(
                r#"
                UPDATE coordination
                SET value = $value, expires_at_ms = $expires_at_ms
                WHERE id = type::thing('coordination', $key)
                    AND value = $expected
                    AND expires_at_ms > $now
                RETURN AFTER
                "#,
            )
            .bind(("key", key.to_string()))
            .bind(("expected", expected.to_string()))
            .bind(("value", value.to_string()))
            .bind(("expires_at_ms", expiry_from_now(ttl)))
            .bind(("now", now_ms()))
            .await?;

        let updated: Vec<CoordinationEntry> = response.take(0)?;
        Ok(!updated.is_empty())
    }

    /// Delete the entry under `key`.
    pub async fn delete_value(&self, key: &str) -> Result<(), DbError> {
        let _: Option<CoordinationEntry> =
            self.db.delete(("coordination", key.to_string())).await?;
        Ok(())
    }

    /// Delete the entry only if it holds `expected`.
    pub async fn delete_value_if_equals(&self, key: &str, expected: &str) -> Result<bool, DbError> {
        let mut response = self
            .db
            .query(
                "DELETE coordination WHERE id = type::thing('coordination', $key) AND value = $expected RETURN BEFORE",
            )
            .bind(("key", key.to_string()))
            .bind(("expected", expected.to_string()))
            .await?;

        let deleted: Vec<CoordinationEntry> = response.take(0)?;
        Ok(!deleted.is_empty())
    }
}

fn unavailable(err: DbError) -> CoordinationError {
    CoordinationError::Unavailable(err.to_string())
}

impl CoordinationStore for CoordinationRepository {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Result<Option<String>, CoordinationError>> {
        Box::pin(async move { self.get_value(key).await.map_err(unavailable) })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, Result<(), CoordinationError>> {
        Box::pin(async move { self.set_value(key, value, ttl).await.map_err(unavailable) })
    }

    fn set_if_absent<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, Result<Option<String>, CoordinationError>> {
        Box::pin(async move {
            self.set_value_if_absent(key, value, ttl)
                .await
                .map_err(unavailable)
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
            self.compare_and_set_value(key, expected, value, ttl)
                .await
                .map_err(unavailable)
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Result<(), CoordinationError>> {
        Box::pin(async move { self.delete_value(key).await.map_err(unavailable) })
    }

    fn delete_if_equals<'a>(
        &'a self,
        key: &'a str,
        expected: &'a str,
    ) -> StoreFuture<'a, Result<bool, CoordinationError>> {
        Box::pin(async move {
            self.delete_value_if_equals(key, expected)
                .await
                .map_err(unavailable)
        })
    }
}
