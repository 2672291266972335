//! Admission control for refresh jobs.

use std::sync::Arc;
use std::time::Duration;

use schedule_core::{
    Admission, AdmissionTicket, CoordinationError, CoordinationStore, Fingerprint, JobId, JobRecord,
    JobStore,
};

/// Key of the single active-job slot.
pub const ACTIVE_JOB_KEY: &str = "schedule:active_job";

/// Lifetime of coordination entries. Frees admissions after a crash.
pub const DEFAULT_COORDINATION_TTL: Duration = Duration::from_secs(10 * 60);

/// Lifetime of job records, terminal ones included.
pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const CLAIM_ATTEMPTS: usize = 3;

/// Coordination key mapping a fingerprint to the job that owns it.
pub fn fingerprint_key(fingerprint: &Fingerprint) -> String {
    format!("schedule:fingerprint:{}", fingerprint)
}

fn parse_holder(key: &str, holder: &str) -> Result<JobId, CoordinationError> {
    JobId::parse(holder)
        .map_err(|e| CoordinationError::Corrupt(format!("{} holds {:?}: {}", key, holder, e)))
}

/// Decides whether a refresh may start for a fingerprint.
///
/// At most one non-terminal job exists per fingerprint. The claim on the
/// fingerprint key is a single `set_if_absent`, and a stale claim is only
/// taken over through `compare_and_set`, so concurrent callers with the same
/// fingerprint cannot both start.
#[derive(Clone)]
pub struct JobCoordinator {
    store: Arc<dyn CoordinationStore>,
    jobs: Arc<dyn JobStore>,
    ttl: Duration,
    job_ttl: Duration,
}

impl JobCoordinator {
    pub fn new(store: Arc<dyn CoordinationStore>, jobs: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            jobs,
            ttl: DEFAULT_COORDINATION_TTL,
            job_ttl: DEFAULT_JOB_TTL,
        }
    }

    /// Set the coordination entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the job record TTL.
    pub fn with_job_ttl(mut self, ttl: Duration) -> Self {
        self.job_ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn job_ttl(&self) -> Duration {
        self.job_ttl
    }

    /// Job record store shared with the runner.
    pub fn jobs(&self) -> &Arc<dyn JobStore> {
        &self.jobs
    }

    /// Admit a job for `fingerprint`, or name the job already running it.
    ///
    /// Fails closed: any store error is returned and whatever this call wrote
    /// is rolled back.
    pub async fn admit(&self, fingerprint: &Fingerprint) -> Result<Admission, CoordinationError> {
        let active = self.store.get(ACTIVE_JOB_KEY).await?;

        let record = JobRecord::pending(JobId::new(), fingerprint.clone());
        let job_id = record.job_id;
        self.jobs.save(&record, self.job_ttl).await?;

        match self.claim(fingerprint, job_id).await {
            Ok(None) => {}
            Ok(Some(holder)) => {
                self.jobs.delete(&job_id).await?;
                tracing::debug!("Fingerprint {} already owned by job {}", fingerprint, holder);
                return Ok(Admission::Duplicate(holder));
            }
            Err(err) => {
                self.discard(job_id).await;
                return Err(err);
            }
        }

        if let Some(other) = active.filter(|a| *a != job_id.to_string()) {
            tracing::warn!(
                "Job {} overwrites active slot held by job {}",
                job_id,
                other
            );
        }

        let value = job_id.to_string();
        if let Err(err) = self.store.set(ACTIVE_JOB_KEY, &value, self.ttl).await {
            if let Err(e) = self
                .store
                .delete_if_equals(&fingerprint_key(fingerprint), &value)
                .await
            {
                tracing::warn!("Failed to roll back claim for job {}: {}", job_id, e);
            }
            self.discard(job_id).await;
            return Err(err);
        }

        tracing::info!("Admitted job {} for {}", job_id, fingerprint);
        Ok(Admission::Started(AdmissionTicket {
            job_id,
            fingerprint: fingerprint.clone(),
        }))
    }

    /// Claim the fingerprint key for `job_id`. Returns the live holder when
    /// the claim is lost.
    async fn claim(
        &self,
        fingerprint: &Fingerprint,
        job_id: JobId,
    ) -> Result<Option<JobId>, CoordinationError> {
        let key = fingerprint_key(fingerprint);
        let value = job_id.to_string();

        for _ in 0..CLAIM_ATTEMPTS {
            let Some(holder) = self.store.set_if_absent(&key, &value, self.ttl).await? else {
                return Ok(None);
            };
            let holder_id = parse_holder(&key, &holder)?;

            if self.is_running(holder_id).await? {
                return Ok(Some(holder_id));
            }

            // Holder finished or its record expired.
            if self
                .store
                .compare_and_set(&key, &holder, &value, self.ttl)
                .await?
            {
                tracing::debug!("Job {} took over stale claim of job {}", job_id, holder_id);
                return Ok(None);
            }

            // Someone else replaced the stale holder first.
            if let Some(winner) = self.store.get(&key).await? {
                return parse_holder(&key, &winner).map(Some);
            }
        }

        Err(CoordinationError::Unavailable(format!(
            "could not claim {} after {} attempts",
            key, CLAIM_ATTEMPTS
        )))
    }

    async fn is_running(&self, job_id: JobId) -> Result<bool, CoordinationError> {
        Ok(self
            .jobs
            .get(&job_id)
            .await?
            .is_some_and(|record| !record.state.is_terminal()))
    }

    async fn discard(&self, job_id: JobId) {
        if let Err(e) = self.jobs.delete(&job_id).await {
            tracing::warn!("Failed to discard pending job {}: {}", job_id, e);
        }
    }

    /// Drop the coordination entries that still name the ticket's job.
    ///
    /// Both entries are attempted even if the first delete fails.
    pub async fn release(&self, ticket: &AdmissionTicket) -> Result<(), CoordinationError> {
        let value = ticket.job_id.to_string();
        let mapping = self
            .store
            .delete_if_equals(&fingerprint_key(&ticket.fingerprint), &value)
            .await;
        let active = self.store.delete_if_equals(ACTIVE_JOB_KEY, &value).await;

        mapping?;
        active?;
        tracing::debug!("Released job {}", ticket.job_id);
        Ok(())
    }

    /// The job currently holding the active slot.
    pub async fn active_job(&self) -> Result<Option<JobId>, CoordinationError> {
        self.store
            .get(ACTIVE_JOB_KEY)
            .await?
            .map(|value| parse_holder(ACTIVE_JOB_KEY, &value))
            .transpose()
    }

    /// Read a job record.
    pub async fn job(&self, job_id: &JobId) -> Result<Option<JobRecord>, CoordinationError> {
        self.jobs.get(job_id).await
    }
}
