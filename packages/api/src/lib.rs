//! Service surface for schedule conflict analysis.
//!
//! This crate wires storage, the refresh actor and an event source into a
//! [`ScheduleService`] offering:
//! - Issue listing with freshness-gated recomputation
//! - Background processing tasks and their status
//! - Lifecycle event subscriptions

mod config;
pub mod dto;
mod error;
mod init;
mod remote;
mod service;
mod source;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use init::{init_memory_service, init_schedule_service, start_schedule_service};
pub use remote::{FeedClient, HttpFeedClient, IndexEntry, IndexPage, RemoteEventSource};
pub use service::ScheduleService;
pub use source::{JsonFileEventSource, StaticEventSource, parse_events};

// Re-export core types for convenience
pub use schedule_core::{
    ConflictIssue, EventSource, IssueCategory, IssueFilter, JobEvent, JobId, JobState,
    NormalizedEvent, SourceError,
};
