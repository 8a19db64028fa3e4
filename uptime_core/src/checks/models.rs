use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Upper bound on an alert body; longer texts are truncated before sending.
pub const MAX_ALERT_LENGTH: usize = 1600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Head => "head",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Up,
    #[default]
    Down,
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckState::Up => write!(f, "up"),
            CheckState::Down => write!(f, "down"),
        }
    }
}

/// A check record that passed validation and may be probed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckDefinition {
    pub id: String,
    pub phone: String,
    pub protocol: Protocol,
    pub url: String,
    pub method: HttpMethod,
    pub success_codes: BTreeSet<u16>,
    pub timeout_seconds: u64,
    #[serde(default)]
    pub state: CheckState,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_checked: Option<DateTime<Utc>>,
}

/// Result of running a probe outcome through the state engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub state: CheckState,
    pub alert: bool,
    pub last_checked: DateTime<Utc>,
}

impl CheckDefinition {
    pub fn target_url(&self) -> String {
        format!("{}://{}", self.protocol, self.url)
    }

    pub fn has_been_checked(&self) -> bool {
        self.last_checked.is_some()
    }

    pub fn accepts(&self, status: u16) -> bool {
        self.success_codes.contains(&status)
    }

    /// Returns a copy carrying the decided state and timestamp.
    pub fn with_decision(&self, decision: &Decision) -> Self {
        Self {
            state: decision.state,
            last_checked: Some(decision.last_checked),
            ..self.clone()
        }
    }

    pub fn alert_message(&self) -> String {
        let mut message = format!(
            "Alert: Your check for {} {} is currently {}",
            self.method.as_str().to_uppercase(),
            self.target_url(),
            self.state
        );
        if message.len() > MAX_ALERT_LENGTH {
            let mut end = MAX_ALERT_LENGTH;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            message.truncate(end);
        }
        message
    }
}
