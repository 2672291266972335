//! Service error type.

use schedule_core::{PersistenceError, RefreshError};
use thiserror::Error;

/// Errors returned by [`ScheduleService`](crate::ScheduleService).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error("actor error: {0}")]
    Actor(String),

    #[error("task_id is required")]
    MissingTaskId,

    #[error("invalid task id: {0}")]
    InvalidTaskId(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}

impl From<PersistenceError> for ServiceError {
    fn from(err: PersistenceError) -> Self {
        ServiceError::Refresh(err.into())
    }
}
