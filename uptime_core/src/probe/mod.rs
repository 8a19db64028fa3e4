pub mod executor;
pub mod transport;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use executor::ProbeExecutor;
pub use transport::{HttpTransport, ProbeRequest, ProbeTransport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCause {
    Timeout,
    Network,
}

impl std::fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCause::Timeout => write!(f, "timeout"),
            ErrorCause::Network => write!(f, "network"),
        }
    }
}

/// Classified result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Responded { status: u16 },
    Error { cause: ErrorCause, message: String },
}

impl ProbeOutcome {
    pub fn timed_out(after: Duration) -> Self {
        ProbeOutcome::Error {
            cause: ErrorCause::Timeout,
            message: format!("no response within {}s", after.as_secs()),
        }
    }

    pub fn network(error: TransportError) -> Self {
        ProbeOutcome::Error {
            cause: ErrorCause::Network,
            message: error.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ProbeOutcome::Responded { status } => Some(*status),
            ProbeOutcome::Error { .. } => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeOutcome::Error { cause: ErrorCause::Timeout, .. })
    }
}
