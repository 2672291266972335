//! Message types for actor communication.

use schedule_core::{Admission, IssueFilter, JobId, JobRecord};
use ractor::RpcReplyPort;

/// Messages for the RefreshActor.
#[derive(Debug)]
pub enum RefreshMessage {
    /// Admit a refresh for the filter and run it in the background.
    Submit {
        filter: IssueFilter,
        reply: RpcReplyPort<Result<Admission, String>>,
    },

    /// Get a job record by ID.
    GetJob {
        job_id: JobId,
        reply: RpcReplyPort<Result<Option<JobRecord>, String>>,
    },

    /// Get the job holding the active slot.
    ActiveJob {
        reply: RpcReplyPort<Result<Option<JobId>, String>>,
    },

    /// Periodic tick for housekeeping.
    Tick,

    /// Stop the actor. Jobs already spawned run to completion.
    Shutdown,
}
