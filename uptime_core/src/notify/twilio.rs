use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::Notifier;
use crate::checks::MAX_ALERT_LENGTH;
use crate::config::NotificationConfig;
use crate::error::{AppError, Result};

const SEND_TIMEOUT_SECS: u64 = 10;

/// Sends alerts as SMS through the Twilio Messages API.
#[derive(Clone)]
pub struct TwilioNotifier {
    client: Client,
    config: NotificationConfig,
}

impl TwilioNotifier {
    pub fn new(config: NotificationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<()> {
        let recipient = recipient.trim();
        if recipient.is_empty() || !recipient.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Notification(format!("invalid recipient '{}'", recipient)));
        }
        let body = text.trim();
        if body.is_empty() || body.len() > MAX_ALERT_LENGTH {
            return Err(AppError::Notification(format!(
                "message must be 1 to {} characters",
                MAX_ALERT_LENGTH
            )));
        }

        let to = format!("+{}", recipient);
        let form = [
            ("From", self.config.from_phone.as_str()),
            ("To", to.as_str()),
            ("Body", body),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Notification(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 200 || status == 201 {
            debug!(recipient = %to, "SMS accepted");
            Ok(())
        } else {
            Err(AppError::Notification(format!("status code returned: {}", status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{basic_auth, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: String) -> NotificationConfig {
        NotificationConfig {
            enabled: true,
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from_phone: "+15005550006".to_string(),
            api_base_url: base,
        }
    }

    #[tokio::test]
    async fn test_posts_form_to_messages_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(basic_auth("AC123", "token"))
            .and(body_string_contains("To=%2B254700000000"))
            .and(body_string_contains("From=%2B15005550006"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = TwilioNotifier::new(config(server.uri())).unwrap();
        notifier
            .send("254700000000", "Alert: Your check for GET http://example.test is currently down")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_status_is_notification_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let notifier = TwilioNotifier::new(config(server.uri())).unwrap();
        let err = notifier.send("254700000000", "hello").await.unwrap_err();
        assert!(matches!(err, AppError::Notification(msg) if msg.contains("401")));
    }

    #[tokio::test]
    async fn test_invalid_parameters_are_not_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let notifier = TwilioNotifier::new(config(server.uri())).unwrap();
        assert!(notifier.send("", "hello").await.is_err());
        assert!(notifier.send("not-a-phone", "hello").await.is_err());
        assert!(notifier.send("254700000000", "   ").await.is_err());
        assert!(notifier.send("254700000000", &"x".repeat(MAX_ALERT_LENGTH + 1)).await.is_err());
    }
}
