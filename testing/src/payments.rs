//! Payment gateway double.

use async_trait::async_trait;
use mentorship_core::gateways::{
    CheckoutRequest, CheckoutSession, GatewayResult, PaymentGateway, PaymentGatewayError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Records checkout requests and returns deterministic sessions.
#[derive(Debug, Clone, Default)]
pub struct RecordingPaymentGateway {
    requests: Arc<RwLock<Vec<CheckoutRequest>>>,
    unavailable: Arc<AtomicBool>,
}

impl RecordingPaymentGateway {
    /// Create a new recording gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call time out.
    pub fn go_down(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    /// Share as a trait object.
    #[must_use]
    pub fn shared(&self) -> Arc<dyn PaymentGateway> {
        Arc::new(self.clone())
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.read().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of calls made to the gateway.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests().len()
    }
}

#[async_trait]
impl PaymentGateway for RecordingPaymentGateway {
    async fn create_checkout(&self, request: CheckoutRequest) -> GatewayResult<CheckoutSession> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PaymentGatewayError::Timeout);
        }
        let session_id = format!("cs_test_{}", request.appointment_id);
        if let Ok(mut requests) = self.requests.write() {
            requests.push(request);
        }
        Ok(CheckoutSession {
            url: format!("https://checkout.test/{session_id}"),
            session_id,
        })
    }
}
