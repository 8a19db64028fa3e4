//! Sweep and rotation counters for the operational endpoints

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use crate::logs::RotationReport;
use crate::scheduler::SweepReport;

#[derive(Clone)]
pub struct MonitorMetrics {
    pub sweeps_completed: Arc<AtomicU64>,
    pub checks_evaluated: Arc<AtomicU64>,
    pub checks_skipped: Arc<AtomicU64>,
    pub checks_failed: Arc<AtomicU64>,
    pub alerts_sent: Arc<AtomicU64>,
    pub alerts_failed: Arc<AtomicU64>,
    pub log_failures: Arc<AtomicU64>,
    pub archives_written: Arc<AtomicU64>,
    pub rotation_failures: Arc<AtomicU64>,
    pub last_sweep: Arc<RwLock<Option<SweepReport>>>,
    pub sweep_in_progress: Arc<RwLock<Option<SweepProgress>>>,
    pub last_rotation: Arc<RwLock<Option<DateTime<Utc>>>>,
    pub start_time: DateTime<Utc>,
}

/// A sweep that has started and not yet finished.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepProgress {
    pub started_at: DateTime<Utc>,
    pub listed: usize,
    /// Worst-case time to evaluate the listed checks, zero until listing finishes.
    pub expected_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub sweeps_completed: u64,
    pub checks_evaluated: u64,
    pub checks_skipped: u64,
    pub checks_failed: u64,
    pub alerts_sent: u64,
    pub alerts_failed: u64,
    pub log_failures: u64,
    pub archives_written: u64,
    pub rotation_failures: u64,
    pub uptime_seconds: i64,
    pub alert_failure_rate: f64,
    pub last_sweep: Option<SweepReport>,
    pub sweep_in_progress: Option<SweepProgress>,
    pub last_rotation: Option<DateTime<Utc>>,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self {
            sweeps_completed: Arc::new(AtomicU64::new(0)),
            checks_evaluated: Arc::new(AtomicU64::new(0)),
            checks_skipped: Arc::new(AtomicU64::new(0)),
            checks_failed: Arc::new(AtomicU64::new(0)),
            alerts_sent: Arc::new(AtomicU64::new(0)),
            alerts_failed: Arc::new(AtomicU64::new(0)),
            log_failures: Arc::new(AtomicU64::new(0)),
            archives_written: Arc::new(AtomicU64::new(0)),
            rotation_failures: Arc::new(AtomicU64::new(0)),
            last_sweep: Arc::new(RwLock::new(None)),
            sweep_in_progress: Arc::new(RwLock::new(None)),
            last_rotation: Arc::new(RwLock::new(None)),
            start_time: Utc::now(),
        }
    }

    pub fn record_sweep_started(&self, started_at: DateTime<Utc>) {
        *self.sweep_in_progress.write() = Some(SweepProgress {
            started_at,
            listed: 0,
            expected_ms: 0,
        });
    }

    pub fn record_sweep_listed(&self, listed: usize, expected: Duration) {
        if let Some(progress) = self.sweep_in_progress.write().as_mut() {
            progress.listed = listed;
            progress.expected_ms = expected.as_millis() as u64;
        }
    }

    pub fn sweep_in_progress(&self) -> Option<SweepProgress> {
        self.sweep_in_progress.read().clone()
    }

    pub fn record_sweep(&self, report: &SweepReport) {
        self.sweeps_completed.fetch_add(1, Ordering::Relaxed);
        self.checks_evaluated.fetch_add(report.evaluated as u64, Ordering::Relaxed);
        self.checks_skipped.fetch_add(report.skipped as u64, Ordering::Relaxed);
        self.checks_failed.fetch_add(report.failed as u64, Ordering::Relaxed);
        self.alerts_sent.fetch_add(report.alerts_sent as u64, Ordering::Relaxed);
        self.alerts_failed.fetch_add(report.alerts_failed as u64, Ordering::Relaxed);
        self.log_failures.fetch_add(report.log_failures as u64, Ordering::Relaxed);

        *self.last_sweep.write() = Some(report.clone());
        *self.sweep_in_progress.write() = None;
    }

    pub fn record_rotation(&self, report: &RotationReport) {
        self.archives_written.fetch_add(report.rotated.len() as u64, Ordering::Relaxed);
        self.rotation_failures.fetch_add(report.failed.len() as u64, Ordering::Relaxed);

        *self.last_rotation.write() = Some(Utc::now());
    }

    /// A rotation pass that could not even list the log directory.
    pub fn record_rotation_error(&self) {
        self.rotation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// When the most recent sweep finished, if any has.
    pub fn last_sweep_at(&self) -> Option<DateTime<Utc>> {
        self.last_sweep.read().as_ref().map(|report| report.finished_at)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let alerts_sent = self.alerts_sent.load(Ordering::Relaxed);
        let alerts_failed = self.alerts_failed.load(Ordering::Relaxed);
        let alerts_total = alerts_sent + alerts_failed;

        MetricsSnapshot {
            sweeps_completed: self.sweeps_completed.load(Ordering::Relaxed),
            checks_evaluated: self.checks_evaluated.load(Ordering::Relaxed),
            checks_skipped: self.checks_skipped.load(Ordering::Relaxed),
            checks_failed: self.checks_failed.load(Ordering::Relaxed),
            alerts_sent,
            alerts_failed,
            log_failures: self.log_failures.load(Ordering::Relaxed),
            archives_written: self.archives_written.load(Ordering::Relaxed),
            rotation_failures: self.rotation_failures.load(Ordering::Relaxed),
            uptime_seconds: Utc::now().signed_duration_since(self.start_time).num_seconds(),
            alert_failure_rate: if alerts_total > 0 {
                (alerts_failed as f64 / alerts_total as f64) * 100.0
            } else {
                0.0
            },
            last_sweep: self.last_sweep.read().clone(),
            sweep_in_progress: self.sweep_in_progress(),
            last_rotation: *self.last_rotation.read(),
        }
    }
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}
