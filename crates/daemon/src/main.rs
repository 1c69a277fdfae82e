//! ERP Intake Daemon - Main Entry Point
//! Claims pending business registrations and runs them through review

mod settings;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use erp_intake_core::application::{shutdown_channel, ReviewProcessor, Worker};
use erp_intake_core::domain::RegistrationStatus;
use erp_intake_core::port::{RegistrationProcessor, RegistrationRepository};
use erp_intake_infra_postgres::{create_pool, run_migrations, DatabaseConfig, PgRegistrationRepository};
use settings::{DaemonSettings, LogFormat};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const WORKER_SHUTDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration (missing database settings are fatal)
    let settings = DaemonSettings::from_env()?;
    init_logging(settings.log_format)?;

    info!("ERP Intake daemon v{} starting...", VERSION);

    let db_config = DatabaseConfig::from_env().context("database configuration")?;
    info!(config = ?db_config, workers = settings.workers, "Configuration loaded");

    // 2. Initialize database
    let pool = create_pool(&db_config)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 3. Setup dependencies (DI wiring)
    let repo: Arc<dyn RegistrationRepository> = Arc::new(PgRegistrationRepository::new(pool.clone()));
    let processor: Arc<dyn RegistrationProcessor> =
        Arc::new(ReviewProcessor::new(settings.min_confidence)?);

    let stuck = repo.count_by_status(RegistrationStatus::Processing).await?;
    if stuck > 0 {
        // Requeue of abandoned claims is not automatic
        tracing::warn!(count = stuck, "Registrations left in processing by an earlier run");
    }

    // 4. Start workers
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let mut handles = Vec::with_capacity(settings.workers);
    for i in 0..settings.workers {
        let worker = Worker::new(format!("worker-{}", i), repo.clone(), processor.clone());
        let shutdown = shutdown_rx.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = worker.run(shutdown).await {
                tracing::error!(error = %e, "Worker failed");
            }
        }));
    }

    info!("System ready. Waiting for registrations...");
    info!("Press Ctrl+C to shutdown");

    // 5. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 6. Graceful shutdown
    shutdown_tx.shutdown();
    let all_workers = futures::future::join_all(handles);
    if tokio::time::timeout(WORKER_SHUTDOWN_TIMEOUT, all_workers)
        .await
        .is_err()
    {
        tracing::warn!("Workers did not stop in time");
    }
    pool.close().await;

    info!("Shutdown complete.");
    Ok(())
}

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("erp_intake=info"))
        .context("Failed to create env filter")?;

    match format {
        LogFormat::Json => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
    Ok(())
}
