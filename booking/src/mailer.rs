//! Mailer adapters.

use async_trait::async_trait;
use mentorship_core::gateways::{DeliveryError, EmailMessage, Mailer};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// Console mailer.
///
/// Logs emails instead of sending them. Used in development.
#[derive(Clone, Debug, Default)]
pub struct ConsoleMailer;

impl ConsoleMailer {
    /// Create a new console mailer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.text,
            "📧 Email (Development Mode)"
        );
        Ok(())
    }
}

/// Default Resend endpoint.
pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Mailer backed by the Resend HTTP API.
#[derive(Clone, Debug)]
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

impl ResendMailer {
    /// Create a mailer sending as `from`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: String, from: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_key,
            from,
            endpoint: RESEND_API_URL.to_string(),
        })
    }

    /// Point the mailer at a different endpoint (for local fakes).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        let body = ResendRequest {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        let reason = format!("resend responded {status}: {detail}");
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(DeliveryError::Transient(reason))
        } else {
            Err(DeliveryError::Rejected(reason))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn console_mailer_always_succeeds() {
        let message = EmailMessage {
            to: "someone@example.com".to_string(),
            subject: "Hello".to_string(),
            text: "Body".to_string(),
            html: "<p>Body</p>".to_string(),
        };
        ConsoleMailer::new().send(&message).await.unwrap();
    }

    #[test]
    fn resend_payload_shape() {
        let body = ResendRequest {
            from: "Mentors <noreply@example.com>",
            to: ["a@example.com"],
            subject: "s",
            html: "<p>h</p>",
            text: "t",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["to"][0], "a@example.com");
        assert_eq!(json["from"], "Mentors <noreply@example.com>");
    }
}
