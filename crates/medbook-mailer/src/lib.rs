//! Transactional email adapter for MedBook
//!
//! Thin wrapper over a Resend-style HTTP email API. Without an API key the
//! adapter runs in development mode: messages are logged and dropped instead
//! of sent, and an optional admin override redirects real deliveries to a
//! single verified address.

use async_trait::async_trait;
use medbook_core::config::MailerConfig;
use medbook_core::traits::{MailMessage, Mailer};
use medbook_core::{AppError, AppResult};
use serde::Serialize;
use tracing::{debug, error, info, instrument};

/// Request body for the email API
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// HTTP email API client
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailerConfig,
}

impl HttpMailer {
    /// Create a mailer from configuration
    pub fn new(config: MailerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Resolve the actual recipient, honoring the admin override
    fn recipient<'a>(&'a self, requested: &'a str) -> &'a str {
        match self.config.admin_email.as_deref() {
            Some(admin) if self.config.api_key.is_some() => {
                // Unverified-domain API keys can only deliver to the admin
                // address; production removes the override.
                admin
            }
            _ => requested,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    async fn send(&self, message: &MailMessage) -> AppResult<()> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            info!(
                "No mailer API key configured, skipping delivery to {}",
                message.to
            );
            return Ok(());
        };

        let to = self.recipient(&message.to);
        if to != message.to {
            debug!(
                "Redirecting delivery from {} to admin address {}",
                message.to, to
            );
        }

        let body = SendRequest {
            from: &self.config.from,
            to: [to],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Email API request failed: {}", e);
                AppError::Email(format!("Request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            error!("Email API returned {}: {}", status, detail);
            return Err(AppError::Email(format!(
                "API returned {}: {}",
                status, detail
            )));
        }

        debug!("Email delivered to {}", to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>, admin: Option<&str>) -> MailerConfig {
        MailerConfig {
            api_url: "https://api.resend.example/emails".to_string(),
            api_key: api_key.map(String::from),
            from: "MedBook <onboarding@resend.dev>".to_string(),
            admin_email: admin.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_skips_delivery() {
        let mailer = HttpMailer::new(config(None, None));
        let message = MailMessage {
            to: "pat@example.com".to_string(),
            subject: "Hello".to_string(),
            html: "<p>hi</p>".to_string(),
        };

        // No network call is made; delivery is a logged no-op
        assert!(mailer.send(&message).await.is_ok());
    }

    #[test]
    fn test_admin_override_only_applies_with_api_key() {
        let mailer = HttpMailer::new(config(Some("key"), Some("admin@example.com")));
        assert_eq!(mailer.recipient("pat@example.com"), "admin@example.com");

        let mailer = HttpMailer::new(config(None, Some("admin@example.com")));
        assert_eq!(mailer.recipient("pat@example.com"), "pat@example.com");

        let mailer = HttpMailer::new(config(Some("key"), None));
        assert_eq!(mailer.recipient("pat@example.com"), "pat@example.com");
    }

    #[test]
    fn test_send_request_serialization() {
        let body = SendRequest {
            from: "MedBook <onboarding@resend.dev>",
            to: ["pat@example.com"],
            subject: "Appointment Confirmed",
            html: "<p>hi</p>",
        };

        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"to\":[\"pat@example.com\"]"));
        assert!(json.contains("\"subject\":\"Appointment Confirmed\""));
    }
}
