//! Application state for the HTTP handlers.
//!
//! Contains every shared resource a handler may touch:
//! - The booking orchestrator (appointments, payments, rescheduling)
//! - Profile, availability and review services
//! - The session verifier and payment webhook secret
//! - A readiness probe for the storage backend

use crate::session::SessionVerifier;
use async_trait::async_trait;
use chrono::Duration;
use mentorship_booking::{
    AvailabilityService, BookingOrchestrator, BookingSettings, InMemoryBookingStore, InMemoryDirectory,
    InMemoryProposalStore, InMemoryReviewStore, NotificationDispatcher, ProfileService, RetryPolicy,
    ReviewService,
};
use mentorship_core::environment::Clock;
use mentorship_core::error::Result;
use mentorship_core::gateways::{Mailer, PaymentGateway};
use mentorship_core::providers::{
    AppointmentStore, AvailabilityStore, HoldLedger, ProfileDirectory, ProposalStore, ReviewStore,
};
use mentorship_postgres::{
    PgPool, PostgresBookingStore, PostgresDirectory, PostgresProposalStore, PostgresReviewStore,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Checks that the storage backend can serve requests.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// # Errors
    ///
    /// Returns the backend failure when it is not ready.
    async fn check(&self) -> Result<()>;
}

/// In-memory storage is ready as soon as it exists.
struct AlwaysReady;

#[async_trait]
impl ReadinessProbe for AlwaysReady {
    async fn check(&self) -> Result<()> {
        Ok(())
    }
}

struct DatabaseProbe(PgPool);

#[async_trait]
impl ReadinessProbe for DatabaseProbe {
    async fn check(&self) -> Result<()> {
        mentorship_postgres::ping(&self.0).await
    }
}

/// The storage side of the application, one trait object per store.
#[derive(Clone)]
pub struct Backends {
    /// Appointment store
    pub appointments: Arc<dyn AppointmentStore>,
    /// Hold ledger
    pub holds: Arc<dyn HoldLedger>,
    /// Users and mentors
    pub directory: Arc<dyn ProfileDirectory>,
    /// Weekly availability
    pub schedules: Arc<dyn AvailabilityStore>,
    /// Reschedule proposals
    pub proposals: Arc<dyn ProposalStore>,
    /// Reviews
    pub reviews: Arc<dyn ReviewStore>,
    /// Readiness check for `/ready`
    pub readiness: Arc<dyn ReadinessProbe>,
}

impl Backends {
    /// Process-local stores. Everything is lost on restart.
    #[must_use]
    pub fn in_memory(clock: Arc<dyn Clock>, hold_ttl: Duration) -> Self {
        let bookings = Arc::new(InMemoryBookingStore::new(clock, hold_ttl));
        let directory = Arc::new(InMemoryDirectory::new());
        Self {
            appointments: bookings.clone(),
            holds: bookings,
            directory: directory.clone(),
            schedules: directory,
            proposals: Arc::new(InMemoryProposalStore::new()),
            reviews: Arc::new(InMemoryReviewStore::new()),
            readiness: Arc::new(AlwaysReady),
        }
    }

    /// `PostgreSQL` stores sharing one pool.
    #[must_use]
    pub fn postgres(pool: PgPool, clock: Arc<dyn Clock>, hold_ttl: Duration) -> Self {
        let bookings = Arc::new(PostgresBookingStore::new(pool.clone(), clock, hold_ttl));
        let directory = Arc::new(PostgresDirectory::new(pool.clone()));
        Self {
            appointments: bookings.clone(),
            holds: bookings,
            directory: directory.clone(),
            schedules: directory,
            proposals: Arc::new(PostgresProposalStore::new(pool.clone())),
            reviews: Arc::new(PostgresReviewStore::new(pool.clone())),
            readiness: Arc::new(DatabaseProbe(pool)),
        }
    }
}

/// Everything besides storage that the handlers need.
pub struct Wiring {
    /// Outgoing email
    pub mailer: Arc<dyn Mailer>,
    /// Checkout sessions
    pub payments: Arc<dyn PaymentGateway>,
    /// Source of "now"
    pub clock: Arc<dyn Clock>,
    /// Booking policy
    pub settings: BookingSettings,
    /// Mailer retry policy
    pub retry: RetryPolicy,
    /// Bearer token resolution
    pub sessions: Arc<dyn SessionVerifier>,
    /// Secret the payment webhook must present
    pub webhook_secret: Option<String>,
}

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply, via `Arc`) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Booking workflow
    pub orchestrator: Arc<BookingOrchestrator>,
    /// User and mentor profiles
    pub profiles: Arc<ProfileService>,
    /// Free/busy and weekly schedules
    pub availability: Arc<AvailabilityService>,
    /// Reviews
    pub reviews: Arc<ReviewService>,
    /// Bearer token resolution
    pub sessions: Arc<dyn SessionVerifier>,
    /// Secret the payment webhook must present; `None` rejects every call
    pub webhook_secret: Option<Arc<str>>,
    /// Readiness check for `/ready`
    pub readiness: Arc<dyn ReadinessProbe>,
}

impl AppState {
    /// Assemble services on top of `backends` and start the notification
    /// worker.
    ///
    /// Must be called inside a tokio runtime. The returned handle resolves
    /// once every clone of the state has been dropped and the notification
    /// queue is drained.
    #[must_use]
    pub fn build(backends: Backends, wiring: Wiring) -> (Self, JoinHandle<()>) {
        let (notifier, worker) =
            NotificationDispatcher::spawn(wiring.mailer, backends.directory.clone(), wiring.retry);

        let orchestrator = BookingOrchestrator::new(
            backends.appointments.clone(),
            backends.directory.clone(),
            backends.proposals,
            wiring.payments,
            notifier,
            wiring.clock.clone(),
            wiring.settings,
        );
        let profiles = ProfileService::new(backends.directory.clone(), wiring.clock.clone());
        let availability = AvailabilityService::new(
            backends.schedules,
            backends.directory.clone(),
            backends.appointments,
            backends.holds,
        );
        let reviews = ReviewService::new(backends.reviews, backends.directory, wiring.clock);

        let state = Self {
            orchestrator: Arc::new(orchestrator),
            profiles: Arc::new(profiles),
            availability: Arc::new(availability),
            reviews: Arc::new(reviews),
            sessions: wiring.sessions,
            webhook_secret: wiring.webhook_secret.map(Arc::from),
            readiness: backends.readiness,
        };
        (state, worker)
    }
}
