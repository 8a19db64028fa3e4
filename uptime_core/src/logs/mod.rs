//! Append-only evaluation logs and their rotation into archives

pub mod rotation;
pub mod writer;

use crate::error::{AppError, Result};

pub use rotation::{LogRotator, RotationReport};
pub use writer::{EvaluationLogger, EvaluationRecord};

pub const LIVE_LOG_EXTENSION: &str = "log";
pub const ARCHIVE_EXTENSION: &str = "archive";

/// Log file names are derived from check ids, so ids must be plain tokens.
pub(crate) fn check_log_id(id: &str) -> Result<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(AppError::Logging(format!("invalid log id '{}'", id)));
    }
    Ok(())
}
