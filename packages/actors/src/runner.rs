//! Execution of refresh jobs.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures_util::FutureExt;
use schedule_core::{
    Admission, AdmissionTicket, AnalysisError, ConflictAnalyzer, ConflictIssue, CoordinationError,
    EventSource, Fingerprint, IssueFilter, JobEvent, JobId, JobOutcome, JobRecord, RefreshError,
    ResultStore,
};
use tokio::sync::broadcast;

use crate::coordinator::JobCoordinator;

/// Result of [`JobRunner::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// This call ran the job. Holds the issues matching the requested filter.
    Completed {
        job_id: JobId,
        issues: Vec<ConflictIssue>,
    },
    /// Another job owns the fingerprint; nothing was done.
    Joined { job_id: JobId },
}

impl RunOutcome {
    pub fn job_id(&self) -> JobId {
        match self {
            RunOutcome::Completed { job_id, .. } | RunOutcome::Joined { job_id } => *job_id,
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "job panicked".to_string()
    }
}

/// Runs admitted jobs: fetch, analyze, persist, record, release.
pub struct JobRunner {
    coordinator: JobCoordinator,
    source: Arc<dyn EventSource>,
    results: Arc<dyn ResultStore>,
    analyzer: ConflictAnalyzer,
    event_tx: Option<broadcast::Sender<JobEvent>>,
}

impl JobRunner {
    pub fn new(
        coordinator: JobCoordinator,
        source: Arc<dyn EventSource>,
        results: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            coordinator,
            source,
            results,
            analyzer: ConflictAnalyzer::default(),
            event_tx: None,
        }
    }

    pub fn with_analyzer(mut self, analyzer: ConflictAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Set the event broadcaster.
    pub fn with_event_tx(mut self, tx: broadcast::Sender<JobEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn coordinator(&self) -> &JobCoordinator {
        &self.coordinator
    }

    pub fn results(&self) -> &Arc<dyn ResultStore> {
        &self.results
    }

    fn emit(&self, event: JobEvent) {
        if let Some(ref tx) = self.event_tx {
            tracing::trace!("{}", event.description());
            let _ = tx.send(event);
        }
    }

    async fn admit(&self, fingerprint: &Fingerprint) -> Result<Admission, CoordinationError> {
        let admission = self.coordinator.admit(fingerprint).await?;
        let event = match &admission {
            Admission::Started(ticket) => JobEvent::JobAdmitted {
                job_id: ticket.job_id,
                fingerprint: fingerprint.clone(),
                timestamp: Utc::now(),
            },
            Admission::Duplicate(job_id) => JobEvent::JobJoined {
                job_id: *job_id,
                fingerprint: fingerprint.clone(),
                timestamp: Utc::now(),
            },
        };
        self.emit(event);
        Ok(admission)
    }

    /// Run a refresh to completion on the calling task.
    pub async fn run(
        &self,
        fingerprint: &Fingerprint,
        filter: &IssueFilter,
    ) -> Result<RunOutcome, RefreshError> {
        match self.admit(fingerprint).await? {
            Admission::Duplicate(job_id) => Ok(RunOutcome::Joined { job_id }),
            Admission::Started(ticket) => {
                let job_id = ticket.job_id;
                let issues = self.execute(ticket, filter.clone()).await?;
                Ok(RunOutcome::Completed { job_id, issues })
            }
        }
    }

    /// Admit a refresh and run it on its own task.
    ///
    /// Returns as soon as admission is decided.
    pub async fn submit(
        self: &Arc<Self>,
        fingerprint: &Fingerprint,
        filter: IssueFilter,
    ) -> Result<Admission, CoordinationError> {
        let admission = self.admit(fingerprint).await?;
        if let Admission::Started(ticket) = &admission {
            let runner = Arc::clone(self);
            let ticket = ticket.clone();
            tokio::spawn(async move {
                // Failures are recorded on the job and logged by execute.
                let _ = runner.execute(ticket, filter).await;
            });
        }
        Ok(admission)
    }

    /// Execute an admitted job. Releases the ticket exactly once, whatever
    /// happens in the body.
    pub async fn execute(
        &self,
        ticket: AdmissionTicket,
        filter: IssueFilter,
    ) -> Result<Vec<ConflictIssue>, RefreshError> {
        let started = Instant::now();
        let job_id = ticket.job_id;
        let job_ttl = self.coordinator.job_ttl();

        let mut record = match self.coordinator.job(&job_id).await {
            Ok(Some(record)) => record,
            _ => JobRecord::pending(job_id, ticket.fingerprint.clone()),
        };

        let result = match AssertUnwindSafe(self.process(&mut record, &filter))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(AnalysisError(panic_message(panic)).into()),
        };

        match &result {
            Ok((outcome, _)) => record.mark_succeeded(outcome.clone()),
            Err(err) => record.mark_failed(err.to_string()),
        }
        let saved = self.coordinator.jobs().save(&record, job_ttl).await;
        if let Err(ref e) = saved {
            tracing::warn!("Failed to record final state of job {}: {}", job_id, e);
        }

        let released = self.coordinator.release(&ticket).await;
        match &released {
            Ok(()) => self.emit(JobEvent::JobReleased {
                job_id,
                timestamp: Utc::now(),
            }),
            Err(e) => tracing::warn!("Failed to release job {}: {}", job_id, e),
        }

        match &result {
            Ok((_, issues)) => {
                tracing::info!(
                    "Job {} succeeded with {} matching issues",
                    job_id,
                    issues.len()
                );
                self.emit(JobEvent::JobSucceeded {
                    job_id,
                    duration_ms: u64::try_from(started.elapsed().as_millis())
                        .unwrap_or(u64::MAX),
                    timestamp: Utc::now(),
                });
            }
            Err(err) => {
                tracing::warn!("Job {} failed ({}): {}", job_id, err.kind(), err);
                self.emit(JobEvent::JobFailed {
                    job_id,
                    kind: err.kind().to_string(),
                    error: err.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }

        let (_, issues) = result?;
        saved?;
        released?;
        Ok(issues)
    }

    /// Returns the job outcome and the issues matching `filter`.
    async fn process(
        &self,
        record: &mut JobRecord,
        filter: &IssueFilter,
    ) -> Result<(JobOutcome, Vec<ConflictIssue>), RefreshError> {
        let job_id = record.job_id;

        record.mark_running();
        self.coordinator
            .jobs()
            .save(record, self.coordinator.job_ttl())
            .await?;
        self.emit(JobEvent::JobRunning {
            job_id,
            timestamp: Utc::now(),
        });

        let events = self.source.fetch().await?;
        tracing::debug!("Job {} fetched {} events", job_id, events.len());

        let analyzer = self.analyzer;
        let detected_at = Utc::now();
        let issues = tokio::task::spawn_blocking(move || analyzer.analyze(&events, detected_at))
            .await
            .map_err(|e| AnalysisError(format!("analysis task failed: {}", e)))?;

        let issue_count = issues.len();
        self.results.replace_all(issues.clone()).await?;
        self.emit(JobEvent::IssuesReplaced {
            job_id,
            issue_count,
            timestamp: Utc::now(),
        });

        let matching = filter.apply(issues);
        let output = serde_json::to_value(&matching)
            .map_err(|e| AnalysisError(format!("failed to encode issues: {}", e)))?;
        let outcome = JobOutcome::with_output(
            format!("{} issues found, {} matching", issue_count, matching.len()),
            output,
        );
        Ok((outcome, matching))
    }
}
