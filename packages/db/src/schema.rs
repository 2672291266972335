//! Database schema definitions using SurrealQL.

use crate::{Database, DbError};

/// Initialize the database schema.
///
/// This creates all necessary tables, fields, and indexes.
pub async fn init_schema(db: &Database) -> Result<(), DbError> {
    tracing::info!("Initializing database schema...");

    db.query(ISSUE_SCHEMA).await?.check()?;
    db.query(JOB_SCHEMA).await?.check()?;
    db.query(COORDINATION_SCHEMA).await?.check()?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// Issue table schema.
///
/// Event snapshots are nested objects, so the table stays schemaless.
const ISSUE_SCHEMA: &str = r#"
-- Current issue set; rows of one analysis pass share a generation
DEFINE TABLE IF NOT EXISTS issue SCHEMALESS;

DEFINE INDEX IF NOT EXISTS issue_generation ON issue FIELDS generation;
DEFINE INDEX IF NOT EXISTS issue_seq ON issue FIELDS seq;
DEFINE INDEX IF NOT EXISTS issue_last_updated ON issue FIELDS last_updated_ms;
"#;

/// Job record table schema.
const JOB_SCHEMA: &str = r#"
-- Refresh job records, expired by expires_at_ms
DEFINE TABLE IF NOT EXISTS job SCHEMALESS;

DEFINE INDEX IF NOT EXISTS job_fingerprint ON job FIELDS fingerprint;
DEFINE INDEX IF NOT EXISTS job_expires ON job FIELDS expires_at_ms;
"#;

/// Coordination key-value table schema.
const COORDINATION_SCHEMA: &str = r#"
-- Admission control entries keyed by record id
DEFINE TABLE IF NOT EXISTS coordination SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS value ON coordination TYPE string;
DEFINE FIELD IF NOT EXISTS expires_at_ms ON coordination TYPE int;

DEFINE INDEX IF NOT EXISTS coordination_expires ON coordination FIELDS expires_at_ms;
"#;
