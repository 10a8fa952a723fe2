use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lyricflow_events::{EventBus, EventLog};
use lyricflow_pipeline::{JobDispatcher, PgStore};
use lyricflow_worker::config::WorkerConfig;
use lyricflow_worker::handlers::stage_handlers;

/// How long to wait for an in-flight cycle to finish on shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lyricflow_worker=debug,lyricflow_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    tracing::info!(
        poll_interval_ms = config.dispatcher.poll_interval.as_millis() as u64,
        batch_size = config.dispatcher.batch_size,
        max_retries = config.dispatcher.retry.max_retries,
        handler_timeout_secs = config.dispatcher.handler_timeout.as_secs(),
        "Loaded worker configuration",
    );

    // --- Database ---
    let pool = lyricflow_db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    lyricflow_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    lyricflow_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let log_handle = tokio::spawn(EventLog::run(event_bus.subscribe()));

    // --- Dispatcher ---
    let store = Arc::new(PgStore::new(pool));
    let dispatcher = Arc::new(
        JobDispatcher::new(
            store.clone(),
            store,
            stage_handlers(&config),
            config.dispatcher.clone(),
        )
        .with_event_bus(Arc::clone(&event_bus)),
    );
    let handle = dispatcher
        .start()
        .context("Job dispatcher already running")?;

    shutdown_signal().await;

    // --- Shutdown ---
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle.stop())
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Job dispatcher did not stop in time",
        );
    }

    // Dropping the last bus sender closes the channel and ends the event log.
    drop(dispatcher);
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), log_handle).await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
