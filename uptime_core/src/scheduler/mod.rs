//! Periodic sweep and rotation tasks

pub mod sweep;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::checks::CheckValidator;
use crate::config::SchedulerConfig;
use crate::logs::{EvaluationLogger, LogRotator};
use crate::metrics::MonitorMetrics;
use crate::notify::Notifier;
use crate::probe::ProbeExecutor;
use crate::store::RecordStore;

pub use sweep::{AlertDelivery, CheckResult, SweepReport};

/// Owns everything a sweep needs. Sweeps run one after another; the checks
/// inside a sweep fan out up to the configured cap.
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<dyn RecordStore>,
    validator: CheckValidator,
    executor: ProbeExecutor,
    logger: EvaluationLogger,
    notifier: Arc<dyn Notifier>,
    config: SchedulerConfig,
    metrics: MonitorMetrics,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        validator: CheckValidator,
        executor: ProbeExecutor,
        logger: EvaluationLogger,
        notifier: Arc<dyn Notifier>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            validator,
            executor,
            logger,
            notifier,
            config,
            metrics: MonitorMetrics::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: MonitorMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &MonitorMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Starts the sweep loop. The first sweep runs immediately; a sweep that
    /// overruns the interval delays the next tick instead of overlapping it.
    pub fn spawn(self) -> JoinHandle<()> {
        let period = self.config.sweep_interval();
        tokio::spawn(async move {
            info!("Sweep loop started, interval {:?}", period);
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.run_sweep().await;
            }
        })
    }
}

/// Starts the rotation loop, independent of the sweep loop.
pub fn spawn_rotation(rotator: LogRotator, period: Duration, metrics: MonitorMetrics) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Rotation loop started, interval {:?}", period);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match rotator.rotate_all().await {
                Ok(report) => {
                    info!(
                        rotated = report.rotated.len(),
                        failed = report.failed.len(),
                        "Log rotation finished"
                    );
                    metrics.record_rotation(&report);
                }
                Err(e) => {
                    error!("Log rotation failed: {}", e);
                    metrics.record_rotation_error();
                }
            }
        }
    })
}
