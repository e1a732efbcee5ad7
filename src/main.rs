// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::application::measurement_job::MeasurementJob;
use crate::application::query_service::MetricsQueryService;
use crate::application::scheduler::Scheduler;
use crate::application::settings_service::SettingsService;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::database::Database;
use crate::infrastructure::sample_store::SqliteSampleRepository;
use crate::infrastructure::settings_store::SqliteSettingsRepository;
use crate::infrastructure::speed_probe::HttpSpeedProbe;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;
    let database = Database::open(config.database_file()).await?;

    // Create repositories (infrastructure layer)
    let samples = Arc::new(SqliteSampleRepository::new(database.clone()));
    let settings_store = Arc::new(SqliteSettingsRepository::new(database.clone()));
    let probe = Arc::new(HttpSpeedProbe::new(config.probe.clone())?);

    // Create services (application layer)
    let scheduler = Arc::new(Scheduler::new());
    let settings_service = Arc::new(
        SettingsService::load(settings_store)
            .await?
            .with_scheduler(scheduler.clone()),
    );
    let settings = settings_service.get().await;

    let job = Arc::new(MeasurementJob::new(probe, samples.clone()));
    scheduler.start(settings.test_interval_minutes, job).await?;

    // Create application state
    let state = Arc::new(AppState {
        query_service: MetricsQueryService::new(samples),
        settings_service,
    });

    // Build router (presentation layer)
    let router = router(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.bind_host, settings.port).parse()?;
    tracing::info!("Starting internet-tester dashboard API on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await?;
    database.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
