//! Service wiring.

use std::sync::Arc;

use actors::{JobCoordinator, JobRunner, RefreshArgs, start_refresh_actor};
use db::memory::{MemoryCoordinationStore, MemoryJobStore, MemoryResultStore};
use db::repositories::{CoordinationRepository, IssueRepository, JobRepository};
use schedule_core::{
    ConflictAnalyzer, CoordinationStore, EventSource, FreshnessGate, JobStore, ResultStore,
};
use tokio::sync::broadcast;

use crate::{ScheduleService, ServiceConfig, ServiceError};

/// Initialize the service on SurrealDB.
///
/// This should be called once at startup.
pub async fn init_schedule_service(
    config: &ServiceConfig,
    source: Arc<dyn EventSource>,
) -> Result<ScheduleService, ServiceError> {
    tracing::info!("Initializing schedule issue service on {}", config.db.endpoint);

    let db = db::init(&config.db).await?;
    let service = start_schedule_service(
        config,
        source,
        Arc::new(CoordinationRepository::new(db.clone())),
        Arc::new(JobRepository::new(db.clone())),
        Arc::new(IssueRepository::new(db)),
    )
    .await?;

    tracing::info!("Schedule issue service initialized");
    Ok(service)
}

/// Initialize the service on in-process stores.
pub async fn init_memory_service(
    config: &ServiceConfig,
    source: Arc<dyn EventSource>,
) -> Result<ScheduleService, ServiceError> {
    start_schedule_service(
        config,
        source,
        Arc::new(MemoryCoordinationStore::new()),
        Arc::new(MemoryJobStore::new()),
        Arc::new(MemoryResultStore::new()),
    )
    .await
}

/// Wire the runner and refresh actor over the given stores.
pub async fn start_schedule_service(
    config: &ServiceConfig,
    source: Arc<dyn EventSource>,
    coordination: Arc<dyn CoordinationStore>,
    jobs: Arc<dyn JobStore>,
    results: Arc<dyn ResultStore>,
) -> Result<ScheduleService, ServiceError> {
    let (event_tx, _) = broadcast::channel(1024);

    let coordinator = JobCoordinator::new(coordination, jobs)
        .with_ttl(config.coordination_ttl)
        .with_job_ttl(config.job_record_ttl);
    let runner = Arc::new(
        JobRunner::new(coordinator, source, results)
            .with_analyzer(ConflictAnalyzer::new(config.analyzer))
            .with_event_tx(event_tx.clone()),
    );

    let args = RefreshArgs::new(runner.clone())
        .with_housekeeping_interval(config.housekeeping_interval);
    let (actor, _handle) = start_refresh_actor(args)
        .await
        .map_err(|e| ServiceError::Actor(format!("Failed to start refresh actor: {}", e)))?;

    Ok(ScheduleService::new(
        runner,
        actor,
        FreshnessGate::new(config.freshness_window),
        event_tx,
    ))
}
