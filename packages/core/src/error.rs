//! Error taxonomy for the refresh pipeline.

use thiserror::Error;

/// Errors raised by an [`EventSource`](crate::EventSource).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Transport or remote failure.
    #[error("fetch error: {0}")]
    Fetch(String),
    /// The source payload as a whole could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Analysis hit an event shape it cannot handle.
///
/// Sources only yield well-formed events, so this signals a broken invariant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("analysis error: {0}")]
pub struct AnalysisError(pub String);

/// Errors raised by a [`ResultStore`](crate::ResultStore).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// The swap did not apply; the previous issue set is still in place.
    #[error("failed to write issues: {0}")]
    Write(String),
    #[error("failed to read issues: {0}")]
    Read(String),
}

/// Errors raised by the coordination and job stores.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoordinationError {
    #[error("coordination store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt coordination entry: {0}")]
    Corrupt(String),
}

/// Any failure of a refresh job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Coordination(#[from] CoordinationError),
}

impl RefreshError {
    /// Short category name for logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            RefreshError::Source(SourceError::Fetch(_)) => "fetch",
            RefreshError::Source(SourceError::Parse(_)) => "parse",
            RefreshError::Analysis(_) => "analysis",
            RefreshError::Persistence(_) => "persistence",
            RefreshError::Coordination(_) => "coordination",
        }
    }
}
