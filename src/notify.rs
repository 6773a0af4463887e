//! Outbound notification collaborators (email, Slack)
//!
//! Send operations return a bare success flag. An unconfigured provider
//! reports failure quietly; callers treat delivery as best-effort.

use async_trait::async_trait;
use serde_json::{json, Value};

const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver a payload to a destination (email address, channel, ...).
    async fn send(&self, destination: &str, payload: &Value) -> bool;
}

/// SendGrid email sender.
///
/// The payload's `subject` and `body` fields become the mail subject and
/// plain-text content.
pub struct EmailSender {
    http: reqwest::Client,
    api_key: Option<String>,
    from_email: String,
}

impl EmailSender {
    pub fn new(api_key: Option<String>, from_email: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            from_email,
        }
    }
}

#[async_trait]
impl NotificationSender for EmailSender {
    async fn send(&self, destination: &str, payload: &Value) -> bool {
        let Some(api_key) = self.api_key.as_ref() else {
            log::debug!("SendGrid not configured; skipping email to {}", destination);
            return false;
        };

        let subject = payload["subject"].as_str().unwrap_or("Compass notification");
        let body = payload["body"].as_str().unwrap_or_default();
        let mail = json!({
            "personalizations": [{ "to": [{ "email": destination }] }],
            "from": { "email": self.from_email },
            "subject": subject,
            "content": [{ "type": "text/plain", "value": body }],
        });

        let result = self
            .http
            .post(SENDGRID_API_URL)
            .bearer_auth(api_key)
            .json(&mail)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                log::error!("SendGrid rejected email: {}", response.status());
                false
            }
            Err(e) => {
                log::error!("Failed to send email: {}", e);
                false
            }
        }
    }
}

/// Slack incoming-webhook sender. The destination argument is unused (the
/// webhook URL already targets one channel) but kept for the common trait.
pub struct SlackSender {
    http: reqwest::Client,
    webhook_url: Option<String>,
}

impl SlackSender {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url,
        }
    }
}

#[async_trait]
impl NotificationSender for SlackSender {
    async fn send(&self, _destination: &str, payload: &Value) -> bool {
        let Some(url) = self.webhook_url.as_ref() else {
            log::debug!("Slack webhook not configured; skipping notification");
            return false;
        };

        let text = payload["body"]
            .as_str()
            .or_else(|| payload["subject"].as_str())
            .unwrap_or("Compass notification");

        let result = self
            .http
            .post(url)
            .json(&json!({ "text": text }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                log::error!("Slack webhook rejected notification: {}", response.status());
                false
            }
            Err(e) => {
                log::error!("Failed to send Slack notification: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_email_reports_failure() {
        let sender = EmailSender::new(None, "noreply@bluepeak.ai".to_string());
        assert!(!sender.send("user@example.com", &json!({})).await);
    }

    #[tokio::test]
    async fn test_unconfigured_slack_reports_failure() {
        let sender = SlackSender::new(None);
        assert!(!sender.send("", &json!({ "body": "hi" })).await);
    }
}
