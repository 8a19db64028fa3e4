//! Up/down decisions and alert gating

use chrono::{DateTime, Utc};

use super::models::{CheckDefinition, CheckState, Decision};
use crate::probe::ProbeOutcome;

/// Decides the next state of `check` from a probe outcome, stamped with the current time.
pub fn decide(check: &CheckDefinition, outcome: &ProbeOutcome) -> Decision {
    decide_at(check, outcome, Utc::now())
}

/// A check is up only when it responded with one of its success codes. The
/// first evaluation of a check never alerts since there is no prior state.
pub fn decide_at(check: &CheckDefinition, outcome: &ProbeOutcome, now: DateTime<Utc>) -> Decision {
    let state = match outcome {
        ProbeOutcome::Responded { status } if check.accepts(*status) => CheckState::Up,
        _ => CheckState::Down,
    };

    Decision {
        state,
        alert: check.has_been_checked() && state != check.state,
        last_checked: now,
    }
}
