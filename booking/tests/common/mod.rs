//! Shared harness for the booking integration suites.

#![allow(dead_code, clippy::unwrap_used)]

use mentorship_booking::retry::RetryPolicy;
use mentorship_booking::{
    BookingOrchestrator, BookingSettings, InMemoryBookingStore, InMemoryDirectory,
    InMemoryProposalStore, NotificationDispatcher,
};
use mentorship_core::gateways::Mailer;
use mentorship_testing::{ManualClock, RecordingMailer, RecordingPaymentGateway, fixtures};
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub orchestrator: Arc<BookingOrchestrator>,
    pub store: Arc<InMemoryBookingStore>,
    pub directory: Arc<InMemoryDirectory>,
    pub clock: ManualClock,
    pub payments: RecordingPaymentGateway,
    pub notifier: NotificationDispatcher,
}

impl Harness {
    pub async fn new(mailer: Arc<dyn Mailer>) -> Self {
        mentorship_testing::init_test_tracing();

        let clock = ManualClock::at(fixtures::monday(8, 0));
        let store = Arc::new(InMemoryBookingStore::new(
            clock.shared(),
            chrono::Duration::minutes(15),
        ));
        let directory = Arc::new(InMemoryDirectory::new());
        fixtures::seed_default_users(directory.as_ref()).await.unwrap();

        let payments = RecordingPaymentGateway::new();
        let retry = RetryPolicy::builder()
            .max_retries(2)
            .initial_delay(Duration::from_millis(1))
            .build();
        let (notifier, _) = NotificationDispatcher::spawn(mailer, directory.clone(), retry);

        let orchestrator = Arc::new(BookingOrchestrator::new(
            store.clone(),
            directory.clone(),
            Arc::new(InMemoryProposalStore::new()),
            payments.shared(),
            notifier.clone(),
            clock.shared(),
            BookingSettings {
                hold_ttl: chrono::Duration::minutes(15),
                ..BookingSettings::default()
            },
        ));

        Self {
            orchestrator,
            store,
            directory,
            clock,
            payments,
            notifier,
        }
    }

    pub async fn with_recording_mailer() -> (Self, RecordingMailer) {
        let mailer = RecordingMailer::new();
        (Self::new(mailer.shared()).await, mailer)
    }
}
