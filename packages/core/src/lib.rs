//! Core domain types for timetable conflict analysis.
//!
//! This crate contains shared types used across all packages:
//! - NormalizedEvent and ConflictIssue for the analyzed data
//! - ConflictAnalyzer and FreshnessGate, the pure decision logic
//! - JobRecord and Admission for refresh coordination
//! - Store and source traits implemented by the storage crate
//! - Events for lifecycle notifications

mod analyzer;
mod error;
mod event;
mod events;
mod freshness;
mod issue;
mod job;
mod store;

pub use analyzer::{AnalyzerConfig, ConflictAnalyzer, format_gap};
pub use error::{AnalysisError, CoordinationError, PersistenceError, RefreshError, SourceError};
pub use event::NormalizedEvent;
pub use events::JobEvent;
pub use freshness::FreshnessGate;
pub use issue::{ConflictIssue, Fingerprint, IssueCategory, IssueFilter};
pub use job::{Admission, AdmissionTicket, JobId, JobOutcome, JobRecord, JobState};
pub use store::{CoordinationStore, EventSource, JobStore, ResultStore, StoreFuture};
