use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::{check_log_id, LIVE_LOG_EXTENSION};
use crate::checks::{CheckDefinition, CheckState, Decision};
use crate::error::{AppError, Result};
use crate::probe::ProbeOutcome;

/// One line of a check's live log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub check: CheckDefinition,
    pub outcome: ProbeOutcome,
    pub state: CheckState,
    pub alert: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
}

impl EvaluationRecord {
    /// `check` is the definition as it was before the decision was applied.
    pub fn new(check: &CheckDefinition, outcome: &ProbeOutcome, decision: &Decision) -> Self {
        Self {
            check: check.clone(),
            outcome: outcome.clone(),
            state: decision.state,
            alert: decision.alert,
            time: decision.last_checked,
        }
    }
}

/// Appends evaluation records to `<dir>/<checkId>.log`.
#[derive(Clone, Debug)]
pub struct EvaluationLogger {
    dir: PathBuf,
}

impl EvaluationLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn live_log_path(&self, check_id: &str) -> Result<PathBuf> {
        check_log_id(check_id)?;
        Ok(self.dir.join(format!("{}.{}", check_id, LIVE_LOG_EXTENSION)))
    }

    /// Appends one newline-terminated JSON entry. The file is opened, written
    /// with a single call, and closed again on every invocation.
    pub async fn record(&self, record: &EvaluationRecord) -> Result<()> {
        let path = self.live_log_path(&record.check.id)?;

        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AppError::Logging(format!("could not open {} for appending: {}", path.display(), e)))?;

        file.write_all(&line)
            .await
            .map_err(|e| AppError::Logging(format!("error appending to {}: {}", path.display(), e)))?;

        file.flush()
            .await
            .map_err(|e| AppError::Logging(format!("error closing {}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Parses every entry currently in the live log of `check_id`.
    pub async fn read_entries(&self, check_id: &str) -> Result<Vec<EvaluationRecord>> {
        let path = self.live_log_path(check_id)?;
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AppError::from))
            .collect()
    }
}
