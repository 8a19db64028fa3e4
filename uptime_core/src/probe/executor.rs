use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::transport::{ProbeRequest, ProbeTransport};
use super::ProbeOutcome;
use crate::checks::CheckDefinition;

/// Runs one bounded-time probe per call.
///
/// The transport call and the timeout race inside a single `select!`; the
/// first to finish decides the outcome and the other branch is dropped, which
/// cancels any request still in flight. A late response therefore has nowhere
/// to report to.
#[derive(Clone)]
pub struct ProbeExecutor {
    transport: Arc<dyn ProbeTransport>,
    max_timeout: Duration,
}

impl ProbeExecutor {
    pub fn new(transport: Arc<dyn ProbeTransport>, max_timeout: Duration) -> Self {
        Self {
            transport,
            max_timeout,
        }
    }

    pub fn timeout_for(&self, check: &CheckDefinition) -> Duration {
        Duration::from_secs(check.timeout_seconds).min(self.max_timeout)
    }

    pub async fn execute(&self, check: &CheckDefinition) -> ProbeOutcome {
        let request = ProbeRequest::for_check(check);
        let timeout = self.timeout_for(check);

        let outcome = tokio::select! {
            biased;
            result = self.transport.send(&request) => match result {
                Ok(status) => ProbeOutcome::Responded { status },
                Err(e) => ProbeOutcome::network(e),
            },
            _ = tokio::time::sleep(timeout) => ProbeOutcome::timed_out(timeout),
        };

        debug!(check_id = %check.id, url = %request.url, ?outcome, "Probe finished");
        outcome
    }
}
