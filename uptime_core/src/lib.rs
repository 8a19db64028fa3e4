//! Core library for the uptime monitor: check validation, probing, state
//! transitions, evaluation logs, the sweep scheduler and the operational
//! HTTP surface.

pub mod checks;
pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod logs;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod probe;
pub mod scheduler;
pub mod store;

pub use checks::{CheckDefinition, CheckState, CheckValidator, Decision, ValidationReport};
pub use config::AppConfig;
pub use error::{AppError, Result};
pub use handlers::routes::create_routes;
pub use health::{HealthCheck, HealthChecker, HealthStatus, SystemHealth};
pub use logs::{EvaluationLogger, EvaluationRecord, LogRotator, RotationReport};
pub use metrics::MonitorMetrics;
pub use notify::{notifier_from_config, Notifier};
pub use probe::{HttpTransport, ProbeExecutor, ProbeOutcome, ProbeTransport};
pub use scheduler::{spawn_rotation, Scheduler, SweepReport};
pub use store::{FileRecordStore, MemoryRecordStore, RecordStore};

use axum::Router;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub metrics: MonitorMetrics,
    pub health_checker: Arc<HealthChecker>,
}

impl AppState {
    pub fn new(metrics: MonitorMetrics, health_checker: HealthChecker) -> Self {
        Self {
            app_name: "Uptime Monitor".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            metrics,
            health_checker: Arc::new(health_checker),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    middleware::logging::with_request_logging(Router::new().merge(create_routes())).with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
