//! Read and submission surface of the schedule issue service.

use std::sync::Arc;

use actors::{ActorRef, JobRunner, RefreshMessage, RunOutcome};
use chrono::Utc;
use schedule_core::{FreshnessGate, IssueFilter, JobEvent, JobId, ResultStore};
use tokio::sync::broadcast;

use crate::ServiceError;
use crate::dto::{IssueView, ProcessResponse, TaskStatusResponse};

/// Entry point for clients: lists issues and manages refresh tasks.
pub struct ScheduleService {
    runner: Arc<JobRunner>,
    actor: ActorRef<RefreshMessage>,
    gate: FreshnessGate,
    event_tx: broadcast::Sender<JobEvent>,
}

impl ScheduleService {
    pub fn new(
        runner: Arc<JobRunner>,
        actor: ActorRef<RefreshMessage>,
        gate: FreshnessGate,
        event_tx: broadcast::Sender<JobEvent>,
    ) -> Self {
        Self {
            runner,
            actor,
            gate,
            event_tx,
        }
    }

    fn results(&self) -> &Arc<dyn ResultStore> {
        self.runner.results()
    }

    /// List stored issues matching `filter`, refreshing first when stale.
    ///
    /// A failed refresh is logged and the current set is served. When a
    /// refresh is already in flight the current set is served at once.
    pub async fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<IssueView>, ServiceError> {
        let newest = self.results().newest_last_updated().await?;

        if self.gate.is_fresh(newest, Utc::now()) {
            tracing::debug!("Stored issues are fresh");
        } else {
            tracing::info!("Stored issues are stale, refreshing");
            // Read-path refreshes recompute everything, so they share one fingerprint.
            let fingerprint = IssueFilter::default().fingerprint();
            match self.runner.run(&fingerprint, filter).await {
                Ok(RunOutcome::Completed { job_id, .. }) => {
                    tracing::info!("Refresh job {} completed", job_id)
                }
                Ok(RunOutcome::Joined { job_id }) => {
                    tracing::info!("Refresh job {} in flight, serving current issues", job_id)
                }
                Err(e) => tracing::warn!("Refresh failed, serving current issues: {}", e),
            }
        }

        let issues = self.results().list(filter).await?;
        Ok(issues.into_iter().map(IssueView::from).collect())
    }

    /// Start background processing for `filter`.
    pub async fn submit_processing(
        &self,
        filter: IssueFilter,
    ) -> Result<ProcessResponse, ServiceError> {
        let (tx, rx) = actors::concurrency::oneshot();
        self.actor
            .send_message(RefreshMessage::Submit {
                filter,
                reply: tx.into(),
            })
            .map_err(|e| ServiceError::Actor(format!("Failed to send message: {}", e)))?;

        let admission = rx
            .await
            .map_err(|_| ServiceError::Actor("Failed to receive response".into()))?
            .map_err(ServiceError::Actor)?;

        Ok(admission.into())
    }

    /// Report the status of a processing task.
    ///
    /// Ids the service has no record of, including expired ones, are pending.
    pub async fn processing_status(&self, task_id: &str) -> Result<TaskStatusResponse, ServiceError> {
        let task_id = task_id.trim();
        if task_id.is_empty() {
            return Err(ServiceError::MissingTaskId);
        }
        let job_id = JobId::parse(task_id)
            .map_err(|e| ServiceError::InvalidTaskId(format!("{}: {}", task_id, e)))?;

        let (tx, rx) = actors::concurrency::oneshot();
        self.actor
            .send_message(RefreshMessage::GetJob {
                job_id,
                reply: tx.into(),
            })
            .map_err(|e| ServiceError::Actor(format!("Failed to send message: {}", e)))?;

        let record = rx
            .await
            .map_err(|_| ServiceError::Actor("Failed to receive response".into()))?
            .map_err(ServiceError::Actor)?;

        Ok(match record {
            Some(record) => record.into(),
            None => TaskStatusResponse::pending(task_id),
        })
    }

    /// Job currently holding the active slot, if any.
    pub async fn active_job(&self) -> Result<Option<JobId>, ServiceError> {
        let (tx, rx) = actors::concurrency::oneshot();
        self.actor
            .send_message(RefreshMessage::ActiveJob { reply: tx.into() })
            .map_err(|e| ServiceError::Actor(format!("Failed to send message: {}", e)))?;

        rx.await
            .map_err(|_| ServiceError::Actor("Failed to receive response".into()))?
            .map_err(ServiceError::Actor)
    }

    /// Subscribe to job lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Stop the refresh actor. Jobs already running finish on their own.
    pub fn shutdown(&self) {
        let _ = self.actor.send_message(RefreshMessage::Shutdown);
    }
}
