//! Main entry point for the uptime monitor binary

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uptime_core::{
    create_app, notifier_from_config, run_server, spawn_rotation, AppConfig, AppState, CheckValidator,
    EvaluationLogger, FileRecordStore, HealthChecker, HttpTransport, LogRotator, MonitorMetrics, ProbeExecutor,
    RecordStore, Scheduler,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    info!("Configuration loaded successfully");
    info!("Server will bind to: {}", config.bind_address());
    info!(
        "Check records in {}, evaluation logs in {}",
        config.storage.data_dir.display(),
        config.storage.log_dir.display()
    );

    config
        .create_directories()
        .map_err(|e| anyhow::anyhow!("Failed to create directories: {}", e))?;

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;

    let store: Arc<dyn RecordStore> = Arc::new(FileRecordStore::new(&config.storage.data_dir));
    let transport = HttpTransport::new().map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
    let notifier = notifier_from_config(&config.notifications)
        .map_err(|e| anyhow::anyhow!("Failed to initialize notifier: {}", e))?;
    let metrics = MonitorMetrics::new();

    let scheduler = Scheduler::new(
        store.clone(),
        CheckValidator::from_config(&config.checks),
        ProbeExecutor::new(Arc::new(transport), config.scheduler.max_timeout()),
        EvaluationLogger::new(&config.storage.log_dir),
        notifier,
        config.scheduler.clone(),
    )
    .with_metrics(metrics.clone());

    let sweep_task = scheduler.spawn();
    let rotation_task = spawn_rotation(
        LogRotator::new(&config.storage.log_dir),
        config.scheduler.rotation_interval(),
        metrics.clone(),
    );
    info!(
        "Background workers started: sweep every {}s, rotation every {}s, up to {} concurrent checks",
        config.scheduler.sweep_interval_seconds,
        config.scheduler.rotation_interval_seconds,
        config.scheduler.max_concurrent_checks
    );

    let health_checker = HealthChecker::for_monitor(
        env!("CARGO_PKG_VERSION").to_string(),
        store,
        vec![config.storage.data_dir.clone(), config.storage.log_dir.clone()],
        metrics.clone(),
        config.scheduler.sweep_interval(),
    );
    let state = AppState::new(metrics, health_checker);

    info!("App: {} v{}", state.app_name, state.version);

    let app = create_app(state);
    let served = run_server(app, addr).await;

    sweep_task.abort();
    rotation_task.abort();

    served?;
    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };

        format!(
            "uptime_core={level},{crate_name}={level},tower_http=info",
            level = default_level,
            crate_name = env!("CARGO_CRATE_NAME").replace('-', "_"),
        )
        .into()
    });

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let is_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    if is_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.pretty())
            .init();
    }
}
