use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::Scheduler;
use crate::checks::{decide, CHECKS_COLLECTION};
use crate::error::AppError;
use crate::logs::EvaluationRecord;

/// What happened to a single check during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckResult {
    /// Record missing or invalid; nothing was probed.
    Skipped,
    /// State persisted. `alert` tells whether a transition alert was due.
    Evaluated { alert: AlertDelivery },
    /// Probed, but the state update could not be persisted.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertDelivery {
    NotDue,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub listed: usize,
    pub evaluated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    pub log_failures: usize,
}

impl SweepReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            duration_ms: 0,
            listed: 0,
            evaluated: 0,
            skipped: 0,
            failed: 0,
            alerts_sent: 0,
            alerts_failed: 0,
            log_failures: 0,
        }
    }

    fn tally(&mut self, result: CheckResult) {
        match result {
            CheckResult::Skipped => self.skipped += 1,
            CheckResult::Failed => self.failed += 1,
            CheckResult::Evaluated { alert } => {
                self.evaluated += 1;
                match alert {
                    AlertDelivery::NotDue => {}
                    AlertDelivery::Sent => self.alerts_sent += 1,
                    AlertDelivery::Failed => self.alerts_failed += 1,
                }
            }
        }
    }
}

impl Scheduler {
    /// Evaluates every registered check once, at most
    /// `max_concurrent_checks` at a time.
    pub async fn run_sweep(&self) -> SweepReport {
        let timer = Instant::now();
        let mut report = SweepReport::new(Utc::now());
        self.metrics.record_sweep_started(report.started_at);

        let keys = match self.store.list(CHECKS_COLLECTION).await {
            Ok(keys) => keys,
            Err(e) => {
                error!("Could not find any checks to process: {}", e);
                Vec::new()
            }
        };
        report.listed = keys.len();

        let concurrency = self.config.max_concurrent_checks.max(1);
        let rounds = ((keys.len() + concurrency - 1) / concurrency) as u32;
        self.metrics.record_sweep_listed(keys.len(), self.config.max_timeout() * rounds);
        let results: Vec<(CheckResult, bool)> = stream::iter(keys)
            .map(|key| async move { self.evaluate_check(&key).await })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        for (result, logged) in results {
            report.tally(result);
            if !logged {
                report.log_failures += 1;
            }
        }

        report.finished_at = Utc::now();
        report.duration_ms = timer.elapsed().as_millis() as u64;
        self.metrics.record_sweep(&report);

        info!(
            listed = report.listed,
            evaluated = report.evaluated,
            skipped = report.skipped,
            failed = report.failed,
            alerts = report.alerts_sent,
            duration_ms = report.duration_ms,
            "Sweep completed"
        );
        report
    }

    /// Runs one check through read, validate, probe, decide, persist, log
    /// and alert. The second value is false when the log append failed.
    pub async fn evaluate_check(&self, key: &str) -> (CheckResult, bool) {
        let mut raw = match self.store.read(CHECKS_COLLECTION, key).await {
            Ok(raw) => raw,
            Err(AppError::NotFound(_)) => {
                debug!(check_id = key, "Check disappeared before evaluation");
                return (CheckResult::Skipped, true);
            }
            Err(e) => {
                warn!(check_id = key, "Error reading one of the checks' data: {}", e);
                return (CheckResult::Skipped, true);
            }
        };

        let check = match self.validator.validate(&raw) {
            Ok(check) if check.id == key => check,
            Ok(check) => {
                warn!(check_id = key, record_id = %check.id, "Check record id does not match its key, skipping");
                return (CheckResult::Skipped, true);
            }
            Err(report) => {
                warn!(check_id = key, "Skipping check: {}", report);
                return (CheckResult::Skipped, true);
            }
        };

        let outcome = self.executor.execute(&check).await;
        let decision = decide(&check, &outcome);

        // The normalized definition replaces its fields; unknown fields on the record are kept.
        match serde_json::to_value(check.with_decision(&decision)) {
            Ok(Value::Object(normalized)) => {
                if let Some(record) = raw.as_object_mut() {
                    record.extend(normalized);
                }
            }
            Ok(_) => {}
            Err(e) => {
                error!(check_id = key, "Error serializing the updated check: {}", e);
                return (CheckResult::Failed, true);
            }
        }

        if let Err(e) = self.store.update(CHECKS_COLLECTION, key, &raw).await {
            error!(check_id = key, "Error trying to save updates to one of the checks: {}", e);
            return (CheckResult::Failed, true);
        }

        let logged = match self
            .logger
            .record(&EvaluationRecord::new(&check, &outcome, &decision))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(check_id = key, "Logging to file failed: {}", e);
                false
            }
        };

        let alert = if decision.alert {
            let updated = check.with_decision(&decision);
            match self.notifier.send(&updated.phone, &updated.alert_message()).await {
                Ok(()) => {
                    info!(check_id = key, state = %decision.state, "Alert sent for state change");
                    AlertDelivery::Sent
                }
                Err(e) => {
                    warn!(check_id = key, state = %decision.state, "Could not send alert for state change: {}", e);
                    AlertDelivery::Failed
                }
            }
        } else {
            debug!(check_id = key, state = %decision.state, "Check outcome has not changed, no alert needed");
            AlertDelivery::NotDue
        };

        (CheckResult::Evaluated { alert }, logged)
    }
}
