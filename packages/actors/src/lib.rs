//! Refresh job coordination and execution.
//!
//! # Architecture
//!
//! - `JobCoordinator` - Admission control over the coordination store
//! - `JobRunner` - Fetches, analyzes and persists for an admitted job
//! - `RefreshActor` - Ractor actor that submits jobs and runs housekeeping
//!
//! # Usage
//!
//! ```ignore
//! use actors::{JobCoordinator, JobRunner, RefreshArgs, RefreshMessage, start_refresh_actor};
//!
//! let coordinator = JobCoordinator::new(coordination_store, job_store);
//! let runner = Arc::new(JobRunner::new(coordinator, source, results));
//! let (actor, handle) = start_refresh_actor(RefreshArgs::new(runner)).await?;
//!
//! let admission = ractor::call!(actor, |reply| RefreshMessage::Submit { filter, reply })?;
//! ```

mod coordinator;
mod messages;
mod refresh_actor;
mod runner;

pub use coordinator::{
    ACTIVE_JOB_KEY, DEFAULT_COORDINATION_TTL, DEFAULT_JOB_TTL, JobCoordinator, fingerprint_key,
};
pub use messages::RefreshMessage;
pub use refresh_actor::{
    DEFAULT_HOUSEKEEPING_INTERVAL, RefreshActor, RefreshActorState, RefreshArgs,
    start_refresh_actor,
};
pub use runner::{JobRunner, RunOutcome};

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort, concurrency};
