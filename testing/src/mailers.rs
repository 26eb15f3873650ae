//! Mailer doubles.

use async_trait::async_trait;
use mentorship_core::gateways::{DeliveryError, EmailMessage, Mailer};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Records every delivered message.
///
/// Can be told to reject specific recipients, or to fail transiently a fixed
/// number of times before succeeding.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<RwLock<Vec<EmailMessage>>>,
    rejected_recipients: Arc<RwLock<HashSet<String>>>,
    transient_failures: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl RecordingMailer {
    /// Create a mailer that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every message to `address`.
    #[must_use]
    pub fn rejecting(self, address: &str) -> Self {
        if let Ok(mut set) = self.rejected_recipients.write() {
            set.insert(address.to_string());
        }
        self
    }

    /// Fail the next `count` sends with a transient error.
    #[must_use]
    pub fn flaky(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Share as a trait object.
    #[must_use]
    pub fn shared(&self) -> Arc<dyn Mailer> {
        Arc::new(self.clone())
    }

    /// Messages delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Messages delivered to `address`.
    #[must_use]
    pub fn sent_to(&self, address: &str) -> Vec<EmailMessage> {
        self.sent().into_iter().filter(|m| m.to == address).collect()
    }

    /// Every call to `send`, including failed ones.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let rejected = self
            .rejected_recipients
            .read()
            .map(|set| set.contains(&message.to))
            .unwrap_or(false);
        if rejected {
            return Err(DeliveryError::Rejected(format!("{} is blocked", message.to)));
        }

        let flaked = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if flaked {
            return Err(DeliveryError::Transient("simulated outage".to_string()));
        }

        if let Ok(mut sent) = self.sent.write() {
            sent.push(message.clone());
        }
        Ok(())
    }
}

/// Fails every send.
#[derive(Debug, Clone, Default)]
pub struct FailingMailer {
    attempts: Arc<AtomicUsize>,
}

impl FailingMailer {
    /// Create a new failing mailer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Share as a trait object.
    #[must_use]
    pub fn shared(&self) -> Arc<dyn Mailer> {
        Arc::new(self.clone())
    }

    /// Number of send attempts observed.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _message: &EmailMessage) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DeliveryError::Rejected("mail provider unavailable".to_string()))
    }
}
