//! Storage backends for the schedule issue service.
//!
//! This crate provides SurrealDB connectivity and repositories implementing
//! the core store traits, plus in-memory equivalents.
//!
//! # Features
//!
//! - `memory` (default): Use in-memory storage for testing
//! - `rocksdb`: Use RocksDB for persistent file-based storage

mod connection;
pub mod memory;
pub mod repositories;
mod schema;

use std::time::Duration;

pub use connection::{Database, DbConfig, DbError, connect};
pub use schema::init_schema;

/// Connect to the configured database and make sure the schema exists.
///
/// This should be called once at application startup; the returned handle is
/// passed to every repository.
pub async fn init(config: &DbConfig) -> Result<Database, DbError> {
    let db = connect(config).await?;
    init_schema(&db).await?;
    Ok(db)
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Absolute expiry in epoch milliseconds for an entry written now.
pub(crate) fn expiry_from_now(ttl: Duration) -> i64 {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_ms().saturating_add(ttl_ms)
}
