//! Repository implementations for database operations.

mod coordination_repo;
mod issue_repo;
mod job_repo;

pub use coordination_repo::CoordinationRepository;
pub use issue_repo::{IssueRepository, MAX_FIELD_LEN, truncate_text};
pub use job_repo::JobRepository;
