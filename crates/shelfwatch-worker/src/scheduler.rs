//! Background job registration.
//!
//! Initialises a [`JobScheduler`] at worker startup and registers the four
//! recurring loops, each behind its own switch. The returned handle must be
//! kept alive for the lifetime of the process and shut down on signal.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use shelfwatch_core::AppConfig;
use shelfwatch_fetch::Fetcher;

use crate::email::EmailSink;
use crate::state::WorkerState;
use crate::{delivery, sweep};

/// Builds and starts the background job scheduler.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, a
/// job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
    state: Arc<WorkerState>,
    fetcher: Arc<Fetcher>,
    sink: Arc<EmailSink>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    state.register_loop("check", config.enable_check_scheduler);
    state.register_loop("email", config.enable_email_scheduler);
    state.register_loop("tracking", config.enable_tracking_scheduler);
    state.register_loop("retention", config.enable_retention_scheduler);

    if config.enable_check_scheduler {
        register_check_job(
            &scheduler,
            pool.clone(),
            Arc::clone(&config),
            Arc::clone(&state),
            Arc::clone(&fetcher),
        )
        .await?;
        state.mark_scheduler_started();
    }

    if config.enable_email_scheduler {
        register_delivery_job(
            &scheduler,
            pool.clone(),
            Arc::clone(&config),
            Arc::clone(&state),
            sink,
        )
        .await?;
        state.mark_scheduler_started();
    }

    if config.enable_tracking_scheduler {
        register_tracking_job(
            &scheduler,
            pool.clone(),
            Arc::clone(&config),
            Arc::clone(&state),
            fetcher,
        )
        .await?;
        state.mark_scheduler_started();
    }

    if config.enable_retention_scheduler {
        register_retention_job(&scheduler, pool, Arc::clone(&config), Arc::clone(&state))
            .await?;
        state.mark_scheduler_started();
    }

    scheduler.start().await?;
    tracing::info!(
        schedulers = state.schedulers_started(),
        "background schedulers started"
    );
    Ok(scheduler)
}

async fn register_check_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
    state: Arc<WorkerState>,
    fetcher: Arc<Fetcher>,
) -> Result<(), JobSchedulerError> {
    let interval = Duration::from_secs(config.check_interval_minutes * 60);

    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let pool = pool.clone();
        let config = Arc::clone(&config);
        let state = Arc::clone(&state);
        let fetcher = Arc::clone(&fetcher);

        Box::pin(async move {
            if state.is_shutting_down() {
                return;
            }
            state.set_loop_running("check", true);
            sweep::run_check_sweep(&pool, fetcher.as_ref(), &config, &state).await;
            state.set_loop_running("check", false);
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn register_delivery_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
    state: Arc<WorkerState>,
    sink: Arc<EmailSink>,
) -> Result<(), JobSchedulerError> {
    let interval = Duration::from_secs(config.email_delivery_interval_minutes * 60);

    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let pool = pool.clone();
        let state = Arc::clone(&state);
        let sink = Arc::clone(&sink);

        Box::pin(async move {
            if state.is_shutting_down() {
                return;
            }
            state.set_loop_running("email", true);
            delivery::run_delivery_sweep(&pool, sink.as_ref()).await;
            state.set_loop_running("email", false);
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn register_tracking_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
    state: Arc<WorkerState>,
    fetcher: Arc<Fetcher>,
) -> Result<(), JobSchedulerError> {
    let interval = Duration::from_secs(config.tracking_interval_minutes * 60);

    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let pool = pool.clone();
        let config = Arc::clone(&config);
        let state = Arc::clone(&state);
        let fetcher = Arc::clone(&fetcher);

        Box::pin(async move {
            if state.is_shutting_down() {
                return;
            }
            state.set_loop_running("tracking", true);
            sweep::run_tracking_sweep(&pool, fetcher.as_ref(), &config, &state).await;
            state.set_loop_running("tracking", false);
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn register_retention_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
    state: Arc<WorkerState>,
) -> Result<(), JobSchedulerError> {
    let interval = Duration::from_secs(config.retention_interval_hours * 60 * 60);

    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let pool = pool.clone();
        let config = Arc::clone(&config);
        let state = Arc::clone(&state);

        Box::pin(async move {
            if state.is_shutting_down() {
                return;
            }
            state.set_loop_running("retention", true);
            sweep::run_retention_sweep(&pool, &config).await;
            state.set_loop_running("retention", false);
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
