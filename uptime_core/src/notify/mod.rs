//! Outbound alert delivery

pub mod twilio;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::NotificationConfig;
use crate::error::Result;

pub use twilio::TwilioNotifier;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, text: &str) -> Result<()>;
}

/// Writes alerts to the tracing output instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<()> {
        info!(recipient, "Alert (delivery disabled): {}", text);
        Ok(())
    }
}

pub fn notifier_from_config(config: &NotificationConfig) -> Result<Arc<dyn Notifier>> {
    if config.enabled {
        Ok(Arc::new(TwilioNotifier::new(config.clone())?))
    } else {
        Ok(Arc::new(LogNotifier))
    }
}
