use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;

use shelfwatch_db::LeaderLock;
use shelfwatch_fetch::{FetchConfig, Fetcher};

use shelfwatch_worker::email::EmailSink;
use shelfwatch_worker::state::WorkerState;
use shelfwatch_worker::{http, scheduler};

/// Grace window for in-flight jobs after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(shelfwatch_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // Panics in spawned jobs abort only their task; log them loudly so a
    // misbehaving strategy or driver is visible in operations.
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "worker panic");
        default_panic(info);
    }));

    let pool_config = shelfwatch_db::PoolConfig::from_app_config(&config);
    let pool = shelfwatch_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = shelfwatch_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "database migrations applied");
    }

    // At most one active scheduler fleet-wide: losing the leadership race
    // is a clean, successful exit.
    let Some(leader) = LeaderLock::acquire(&pool).await? else {
        tracing::info!("another worker holds the MAIN_SCHEDULER lock; exiting");
        return Ok(());
    };
    tracing::info!(key = leader.key(), "acquired scheduler leadership");

    let state = Arc::new(WorkerState::new());
    state.set_leader_key(leader.key());

    let fetcher = Arc::new(Fetcher::new(FetchConfig::from_app_config(&config))?);
    let sink = Arc::new(EmailSink::from_app_config(&config)?);
    if !sink.is_configured() {
        tracing::warn!("EMAIL_WEBHOOK_URL unset; notifications will accumulate unsent");
    }

    let listener = http::bind_with_fallback(config.worker_port).await?;
    tracing::info!(addr = %listener.local_addr()?, "control surface listening");

    let (http_shutdown_tx, http_shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let app = http::router(Arc::clone(&state));
    let http_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                http_shutdown_rx.await.ok();
            })
            .await
    });

    let job_scheduler = if config.enable_scheduler {
        Some(
            scheduler::build_scheduler(
                pool.clone(),
                Arc::clone(&config),
                Arc::clone(&state),
                Arc::clone(&fetcher),
                Arc::clone(&sink),
            )
            .await?,
        )
    } else {
        tracing::warn!("ENABLE_SCHEDULER=false; worker runs with no timers");
        None
    };

    shutdown_signal().await;
    tracing::info!("received shutdown signal, starting graceful shutdown");
    state.begin_shutdown();

    // Stop the timers first so no new jobs start, then give in-flight jobs
    // a bounded window to finish.
    if let Some(mut job_scheduler) = job_scheduler {
        if let Err(e) = job_scheduler.shutdown().await {
            tracing::warn!(error = %e, "job scheduler shutdown reported an error");
        }
    }

    let drain_deadline = Instant::now() + DRAIN_TIMEOUT;
    loop {
        let active = state.active_products();
        if active.is_empty() {
            break;
        }
        if Instant::now() >= drain_deadline {
            tracing::warn!(?active, "drain window elapsed with jobs still active");
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    state.clear_leader_key();
    if let Err(e) = leader.release().await {
        tracing::warn!(error = %e, "leader lock release failed; connection close will free it");
    }

    http_shutdown_tx.send(()).ok();
    match tokio::time::timeout(Duration::from_secs(5), http_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::warn!(error = %e, "control server exited with error"),
        Ok(Err(e)) => tracing::warn!(error = %e, "control server task join failed"),
        Err(_) => tracing::warn!("control server did not stop inside the grace window"),
    }

    pool.close().await;
    tracing::info!("worker shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
