//! Health checks for the monitor's own components

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::{error, info, warn};

use crate::checks::CHECKS_COLLECTION;
use crate::metrics::MonitorMetrics;
use crate::store::RecordStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub response_time_ms: u64,
    pub last_checked: chrono::DateTime<chrono::Utc>,
}

impl ComponentHealth {
    fn with_status(status: HealthStatus, message: String, response_time_ms: u64) -> Self {
        Self {
            status,
            message,
            details: None,
            response_time_ms,
            last_checked: Utc::now(),
        }
    }

    pub fn healthy(message: String, response_time_ms: u64) -> Self {
        Self::with_status(HealthStatus::Healthy, message, response_time_ms)
    }

    pub fn degraded(message: String, response_time_ms: u64) -> Self {
        Self::with_status(HealthStatus::Degraded, message, response_time_ms)
    }

    pub fn unhealthy(message: String, response_time_ms: u64) -> Self {
        Self::with_status(HealthStatus::Unhealthy, message, response_time_ms)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    pub components: HashMap<String, ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub uptime_seconds: u64,
    pub version: String,
}

impl SystemHealth {
    pub fn new(version: String, uptime_seconds: u64) -> Self {
        Self {
            overall_status: HealthStatus::Healthy,
            components: HashMap::new(),
            timestamp: Utc::now(),
            uptime_seconds,
            version,
        }
    }

    pub fn add_component(&mut self, name: String, health: ComponentHealth) {
        match health.status {
            HealthStatus::Unhealthy => {
                self.overall_status = HealthStatus::Unhealthy;
            }
            HealthStatus::Degraded => {
                if self.overall_status == HealthStatus::Healthy {
                    self.overall_status = HealthStatus::Degraded;
                }
            }
            HealthStatus::Healthy => {}
        }

        self.components.insert(name, health);
    }

    pub fn is_healthy(&self) -> bool {
        self.overall_status == HealthStatus::Healthy
    }
}

#[async_trait::async_trait]
pub trait HealthCheck {
    async fn check(&self) -> ComponentHealth;
    fn name(&self) -> &str;
}

/// Healthy when the check collection can be listed.
pub struct RecordStoreHealthCheck {
    store: Arc<dyn RecordStore>,
}

impl RecordStoreHealthCheck {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl HealthCheck for RecordStoreHealthCheck {
    async fn check(&self) -> ComponentHealth {
        let start = Instant::now();

        match self.store.list(CHECKS_COLLECTION).await {
            Ok(keys) => {
                let response_time = start.elapsed().as_millis() as u64;
                ComponentHealth::healthy(
                    format!("Record store operational with {} checks", keys.len()),
                    response_time,
                )
                .with_details(serde_json::json!({ "checks": keys.len() }))
            }
            Err(e) => {
                let response_time = start.elapsed().as_millis() as u64;
                ComponentHealth::unhealthy(format!("Record store listing failed: {}", e), response_time)
                    .with_details(serde_json::json!({
                        "error": e.to_string(),
                        "collection": CHECKS_COLLECTION
                    }))
            }
        }
    }

    fn name(&self) -> &str {
        "record_store"
    }
}

pub struct FilesystemHealthCheck {
    paths: Vec<PathBuf>,
}

impl FilesystemHealthCheck {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

#[async_trait::async_trait]
impl HealthCheck for FilesystemHealthCheck {
    async fn check(&self) -> ComponentHealth {
        let start = Instant::now();
        let mut issues = Vec::new();
        let mut details = serde_json::Map::new();

        for path in &self.paths {
            let key = path.display().to_string();

            let is_dir = match fs::metadata(path).await {
                Ok(metadata) => metadata.is_dir(),
                Err(_) => {
                    issues.push(format!("Directory does not exist: {}", key));
                    details.insert(key, serde_json::json!({ "exists": false, "writable": false }));
                    continue;
                }
            };
            if !is_dir {
                issues.push(format!("Not a directory: {}", key));
                details.insert(key, serde_json::json!({ "exists": true, "writable": false }));
                continue;
            }

            let probe = path.join(".health_check_temp");
            let writable = match fs::write(&probe, "test").await {
                Ok(_) => {
                    let _ = fs::remove_file(&probe).await;
                    true
                }
                Err(_) => false,
            };
            if !writable {
                issues.push(format!("Cannot write to directory: {}", key));
            }

            details.insert(key, serde_json::json!({ "exists": true, "writable": writable }));
        }

        let response_time = start.elapsed().as_millis() as u64;

        if issues.is_empty() {
            ComponentHealth::healthy("All directories accessible".to_string(), response_time)
                .with_details(serde_json::Value::Object(details))
        } else if issues.len() < self.paths.len() {
            ComponentHealth::degraded(
                format!("Some filesystem issues: {}", issues.join(", ")),
                response_time,
            )
            .with_details(serde_json::json!({ "paths": details, "issues": issues }))
        } else {
            ComponentHealth::unhealthy(
                format!("Filesystem access failed: {}", issues.join(", ")),
                response_time,
            )
            .with_details(serde_json::json!({ "paths": details, "issues": issues }))
        }
    }

    fn name(&self) -> &str {
        "filesystem"
    }
}

/// Flags a sweep loop that has stopped completing sweeps, or a sweep that
/// has run well past the time its checks could take.
pub struct SchedulerHealthCheck {
    metrics: MonitorMetrics,
    max_age: Duration,
}

impl SchedulerHealthCheck {
    /// `max_age` is how long after the last finished sweep the loop is still
    /// considered alive. A running sweep gets `max_age` on top of its
    /// worst-case duration.
    pub fn new(metrics: MonitorMetrics, max_age: Duration) -> Self {
        Self { metrics, max_age }
    }
}

#[async_trait::async_trait]
impl HealthCheck for SchedulerHealthCheck {
    async fn check(&self) -> ComponentHealth {
        let max_age_secs = self.max_age.as_secs() as i64;

        if let Some(progress) = self.metrics.sweep_in_progress() {
            let running_for = Utc::now().signed_duration_since(progress.started_at).num_seconds();
            let limit = max_age_secs + (progress.expected_ms / 1000) as i64;
            let details = serde_json::json!({
                "sweep_started_at": progress.started_at,
                "running_seconds": running_for,
                "listed": progress.listed,
                "threshold_seconds": limit
            });
            return if running_for > limit {
                ComponentHealth::unhealthy(
                    format!("Sweep running for {}s, over the {}s limit", running_for, limit),
                    0,
                )
                .with_details(details)
            } else {
                ComponentHealth::healthy(format!("Sweep in progress for {}s", running_for), 0)
                    .with_details(details)
            };
        }

        match self.metrics.last_sweep_at() {
            None => {
                let running_for = Utc::now().signed_duration_since(self.metrics.start_time).num_seconds();
                if running_for > max_age_secs {
                    ComponentHealth::unhealthy(
                        format!("No sweep completed in {}s", running_for),
                        0,
                    )
                } else {
                    ComponentHealth::degraded("No sweep completed yet".to_string(), 0)
                }
            }
            Some(finished_at) => {
                let age = Utc::now().signed_duration_since(finished_at).num_seconds();
                let details = serde_json::json!({
                    "last_sweep_at": finished_at,
                    "age_seconds": age,
                    "threshold_seconds": max_age_secs
                });
                if age > max_age_secs {
                    ComponentHealth::unhealthy(format!("Last sweep finished {}s ago", age), 0)
                        .with_details(details)
                } else {
                    ComponentHealth::healthy(format!("Last sweep finished {}s ago", age), 0)
                        .with_details(details)
                }
            }
        }
    }

    fn name(&self) -> &str {
        "scheduler"
    }
}

pub struct HealthChecker {
    checks: Vec<Box<dyn HealthCheck + Send + Sync>>,
    start_time: Instant,
    version: String,
}

impl HealthChecker {
    pub fn new(version: String) -> Self {
        Self {
            checks: Vec::new(),
            start_time: Instant::now(),
            version,
        }
    }

    pub fn add_check<T: HealthCheck + Send + Sync + 'static>(mut self, check: T) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    pub async fn check_all(&self) -> SystemHealth {
        let uptime_seconds = self.start_time.elapsed().as_secs();
        let mut system_health = SystemHealth::new(self.version.clone(), uptime_seconds);

        for check in &self.checks {
            let component_name = check.name().to_string();
            let start = Instant::now();

            let health = check.check().await;
            let check_duration = start.elapsed();

            match health.status {
                HealthStatus::Healthy => {
                    info!("Health check '{}' passed in {:?}", component_name, check_duration);
                }
                HealthStatus::Degraded => {
                    warn!("Health check '{}' degraded in {:?}: {}", component_name, check_duration, health.message);
                }
                HealthStatus::Unhealthy => {
                    error!("Health check '{}' failed in {:?}: {}", component_name, check_duration, health.message);
                }
            }

            system_health.add_component(component_name, health);
        }

        system_health
    }

    pub async fn check_component(&self, component_name: &str) -> Option<ComponentHealth> {
        for check in &self.checks {
            if check.name() == component_name {
                return Some(check.check().await);
            }
        }
        None
    }
}

impl HealthChecker {
    /// Standard checks for a running monitor: the record store, the data and
    /// log directories, and sweep recency (three missed intervals is fatal).
    pub fn for_monitor(
        version: String,
        store: Arc<dyn RecordStore>,
        directories: Vec<PathBuf>,
        metrics: MonitorMetrics,
        sweep_interval: Duration,
    ) -> Self {
        HealthChecker::new(version)
            .add_check(RecordStoreHealthCheck::new(store))
            .add_check(FilesystemHealthCheck::new(directories))
            .add_check(SchedulerHealthCheck::new(metrics, sweep_interval * 3))
    }
}
