//! Payment gateway adapters.
//!
//! Both adapters only create hosted checkout sessions. Capture is confirmed
//! asynchronously by the processor calling `/appointment/paid`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mentorship_core::gateways::{
    CheckoutRequest, CheckoutSession, GatewayResult, PaymentGateway, PaymentGatewayError,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Mock payment gateway (always succeeds for development)
#[derive(Clone, Debug, Default)]
pub struct MockPaymentGateway;

impl MockPaymentGateway {
    /// Creates a new mock payment gateway
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout(&self, request: CheckoutRequest) -> GatewayResult<CheckoutSession> {
        let session_id = format!("mock_cs_{}", uuid::Uuid::new_v4().simple());

        tracing::info!(
            appointment_id = %request.appointment_id,
            amount = request.amount.cents(),
            session_id = %session_id,
            "Mock checkout session created"
        );

        Ok(CheckoutSession {
            url: format!("http://localhost/mock-checkout/{session_id}"),
            session_id,
        })
    }
}

/// Default Stripe endpoint.
pub const STRIPE_CHECKOUT_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

/// Shortest checkout session lifetime Stripe accepts (30 minutes), plus a
/// minute for clock skew and request latency.
pub const STRIPE_MIN_SESSION_MINUTES: i64 = 31;

/// Longest checkout session lifetime Stripe accepts.
pub const STRIPE_MAX_SESSION_MINUTES: i64 = 24 * 60;

/// Clamp a requested session expiry into the window Stripe accepts.
///
/// A hold shorter than the minimum still yields a payable session past the
/// hold; the orchestrator flags such late payments for refund.
#[must_use]
pub fn stripe_session_expiry(requested: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    requested.clamp(
        now + chrono::Duration::minutes(STRIPE_MIN_SESSION_MINUTES),
        now + chrono::Duration::minutes(STRIPE_MAX_SESSION_MINUTES),
    )
}

/// Stripe Checkout adapter.
#[derive(Clone, Debug)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    success_url: String,
    cancel_url: String,
    currency: String,
    endpoint: String,
}

#[derive(Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl StripeGateway {
    /// Create a gateway charging in USD.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        secret_key: String,
        success_url: String,
        cancel_url: String,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            secret_key,
            success_url,
            cancel_url,
            currency: "usd".to_string(),
            endpoint: STRIPE_CHECKOUT_URL.to_string(),
        })
    }

    /// Point the gateway at a different endpoint (for stripe-mock).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn form(&self, request: &CheckoutRequest) -> Vec<(&'static str, String)> {
        let appointment_id = request.appointment_id.to_string();
        let mut form = vec![
            ("mode", "payment".to_string()),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("client_reference_id", appointment_id.clone()),
            ("metadata[appointment_id]", appointment_id),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", self.currency.clone()),
            (
                "line_items[0][price_data][unit_amount]",
                request.amount.cents().to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                request.description.clone(),
            ),
        ];
        if let Some(email) = &request.customer_email {
            form.push(("customer_email", email.clone()));
        }
        if let Some(expires_at) = request.expires_at {
            let expires_at = stripe_session_expiry(expires_at, Utc::now());
            form.push(("expires_at", expires_at.timestamp().to_string()));
        }
        form
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout(&self, request: CheckoutRequest) -> GatewayResult<CheckoutSession> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&self.form(&request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PaymentGatewayError::Timeout
                } else {
                    PaymentGatewayError::Other {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| format!("stripe responded {status}"));
            return Err(if status.is_client_error() {
                PaymentGatewayError::Rejected { reason }
            } else {
                PaymentGatewayError::Other { message: reason }
            });
        }

        let session: StripeSession = response.json().await.map_err(|e| PaymentGatewayError::Other {
            message: format!("unreadable checkout session: {e}"),
        })?;
        let url = session.url.ok_or_else(|| PaymentGatewayError::Other {
            message: "checkout session has no url".to_string(),
        })?;

        tracing::info!(
            appointment_id = %request.appointment_id,
            session_id = %session.id,
            "Stripe checkout session created"
        );
        Ok(CheckoutSession {
            session_id: session.id,
            url,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mentorship_core::types::{AppointmentId, Money};

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            appointment_id: AppointmentId::new(),
            amount: Money::from_cents(12_000),
            description: "Mock interview".to_string(),
            customer_email: Some("mentee@example.com".to_string()),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
        }
    }

    #[tokio::test]
    async fn mock_gateway_creates_session() {
        let session = MockPaymentGateway::new().create_checkout(request()).await.unwrap();
        assert!(session.session_id.starts_with("mock_cs_"));
        assert!(session.url.ends_with(&session.session_id));
    }

    #[test]
    fn stripe_form_carries_amount_and_reference() {
        let gateway = StripeGateway::new(
            "sk_test_123".to_string(),
            "https://app.test/success".to_string(),
            "https://app.test/cancel".to_string(),
        )
        .unwrap();
        let request = request();
        let form = gateway.form(&request);

        let get = |key: &str| form.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone());
        assert_eq!(get("line_items[0][price_data][unit_amount]").as_deref(), Some("12000"));
        assert_eq!(get("client_reference_id"), Some(request.appointment_id.to_string()));
        assert_eq!(get("customer_email").as_deref(), Some("mentee@example.com"));
        assert_eq!(
            get("expires_at"),
            request.expires_at.map(|at| at.timestamp().to_string())
        );
    }

    #[test]
    fn session_expiry_stays_within_stripe_limits() {
        let now = Utc::now();
        let hold_end = now + chrono::Duration::minutes(45);
        assert_eq!(stripe_session_expiry(hold_end, now), hold_end);

        let short = stripe_session_expiry(now + chrono::Duration::minutes(5), now);
        assert_eq!(short, now + chrono::Duration::minutes(STRIPE_MIN_SESSION_MINUTES));

        let long = stripe_session_expiry(now + chrono::Duration::days(3), now);
        assert_eq!(long, now + chrono::Duration::hours(24));
    }
}
