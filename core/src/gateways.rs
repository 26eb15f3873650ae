//! Outbound service traits: transactional email and payment processing.
//!
//! Adapters live in `mentorship-booking`; test doubles in
//! `mentorship-testing`.

use crate::types::{AppointmentId, Money};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// A rendered email ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub text: String,
    /// HTML body
    pub html: String,
}

/// Email delivery failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Network error, rate limit or provider outage; worth retrying
    #[error("transient delivery failure: {0}")]
    Transient(String),
    /// Provider refused the message (bad address, invalid key)
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

impl DeliveryError {
    /// `true` if a retry may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Transactional email sender.
///
/// Abstraction over delivery services like Resend, `SendGrid` or SES.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] if the provider cannot accept the message.
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError>;
}

/// Payment gateway result
pub type GatewayResult<T> = Result<T, PaymentGatewayError>;

/// Payment gateway error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentGatewayError {
    /// The processor rejected the request
    #[error("payment request rejected: {reason}")]
    Rejected {
        /// Processor-supplied reason
        reason: String,
    },
    /// Gateway timeout
    #[error("payment gateway timeout")]
    Timeout,
    /// Other error
    #[error("payment error: {message}")]
    Other {
        /// Error message
        message: String,
    },
}

/// What to charge for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Appointment being paid; echoed back by the processor's webhook
    pub appointment_id: AppointmentId,
    /// Amount to charge
    pub amount: Money,
    /// Line-item description shown to the payer
    pub description: String,
    /// Payer's email, prefilled on the checkout page
    pub customer_email: Option<String>,
    /// When the slot's hold lapses; the session should stop accepting
    /// payment by then
    pub expires_at: Option<DateTime<Utc>>,
}

/// A hosted checkout page created by the processor.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct CheckoutSession {
    /// Processor session id
    pub session_id: String,
    /// URL the payer is redirected to
    pub url: String,
}

/// Payment gateway trait
///
/// Abstraction over payment processors like Stripe. Capture happens on the
/// processor's side; its webhook reports success back through
/// `/appointment/paid`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentGatewayError`] if the processor call fails.
    async fn create_checkout(&self, request: CheckoutRequest) -> GatewayResult<CheckoutSession>;
}
