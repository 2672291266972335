//! Actor fronting the job runner.

use std::sync::Arc;
use std::time::Duration;

use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::task::JoinHandle;

use crate::messages::RefreshMessage;
use crate::runner::JobRunner;

/// Default interval between housekeeping ticks.
pub const DEFAULT_HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

/// Refresh actor arguments.
pub struct RefreshArgs {
    pub runner: Arc<JobRunner>,
    pub housekeeping_interval: Duration,
}

impl RefreshArgs {
    pub fn new(runner: Arc<JobRunner>) -> Self {
        Self {
            runner,
            housekeeping_interval: DEFAULT_HOUSEKEEPING_INTERVAL,
        }
    }

    pub fn with_housekeeping_interval(mut self, interval: Duration) -> Self {
        self.housekeeping_interval = interval;
        self
    }
}

/// State for the refresh actor.
pub struct RefreshActorState {
    pub runner: Arc<JobRunner>,
    ticker: Option<JoinHandle<()>>,
}

/// Actor that admits refresh jobs and keeps the job store tidy.
///
/// Admission happens inside the handler; execution runs on spawned tasks so
/// the mailbox never waits on a job.
pub struct RefreshActor;

impl Actor for RefreshActor {
    type Msg = RefreshMessage;
    type State = RefreshActorState;
    type Arguments = RefreshArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting refresh actor");

        let interval = args.housekeeping_interval;
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            loop {
                interval.tick().await;
                if myself.send_message(RefreshMessage::Tick).is_err() {
                    break;
                }
            }
        });

        Ok(RefreshActorState {
            runner: args.runner,
            ticker: Some(ticker),
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            RefreshMessage::Submit { filter, reply } => {
                let fingerprint = filter.fingerprint();
                let admission = state
                    .runner
                    .submit(&fingerprint, filter)
                    .await
                    .map_err(|e| e.to_string());
                if let Err(ref e) = admission {
                    tracing::warn!("Admission for {} failed: {}", fingerprint, e);
                }
                let _ = reply.send(admission);
            }

            RefreshMessage::GetJob { job_id, reply } => {
                let record = state
                    .runner
                    .coordinator()
                    .job(&job_id)
                    .await
                    .map_err(|e| e.to_string());
                let _ = reply.send(record);
            }

            RefreshMessage::ActiveJob { reply } => {
                let active = state
                    .runner
                    .coordinator()
                    .active_job()
                    .await
                    .map_err(|e| e.to_string());
                let _ = reply.send(active);
            }

            RefreshMessage::Tick => {
                match state.runner.coordinator().jobs().purge_expired().await {
                    Ok(0) => {}
                    Ok(purged) => tracing::debug!("Purged {} expired job records", purged),
                    Err(e) => tracing::warn!("Job record purge failed: {}", e),
                }
            }

            RefreshMessage::Shutdown => {
                tracing::info!("Shutting down refresh actor");
                myself.stop(None);
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        Ok(())
    }
}

/// Start a refresh actor around `runner`.
pub async fn start_refresh_actor(
    args: RefreshArgs,
) -> Result<(ActorRef<RefreshMessage>, JoinHandle<()>), ractor::SpawnErr> {
    let (actor, handle) = Actor::spawn(None, RefreshActor, args).await?;

    Ok((actor, handle))
}
