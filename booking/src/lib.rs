//! # Mentorship Booking
//!
//! The imperative shell around `mentorship-core`.
//!
//! ## Core Components
//!
//! - **`BookingOrchestrator`**: booking, confirmation, payment, cancellation,
//!   rescheduling and checkout
//! - **`NotificationDispatcher`**: queue plus worker task sending emails,
//!   isolated from booking results
//! - **`HoldSweeper`**: periodic expiry of abandoned holds
//! - **Services**: profiles, availability and reviews
//! - **Adapters**: in-memory stores, console/Resend mailers, mock/Stripe
//!   payment gateways
//!
//! ## Example
//!
//! ```ignore
//! use mentorship_booking::{BookingOrchestrator, NotificationDispatcher};
//!
//! let (notifier, _worker) = NotificationDispatcher::spawn(mailer, directory.clone(), RetryPolicy::default());
//! let orchestrator = BookingOrchestrator::new(
//!     store, directory, proposals, payments, notifier, clock, BookingSettings::default(),
//! );
//!
//! let appointment = orchestrator.book(draft, &session_user).await?;
//! ```

/// Notification queue and worker
pub mod dispatcher;

/// Mailer adapters
pub mod mailer;

/// In-memory stores
pub mod memory;

/// Prometheus metrics for observability
pub mod metrics;

/// Booking workflow
pub mod orchestrator;

/// Payment gateway adapters
pub mod payment;

/// Retry logic with exponential backoff
pub mod retry;

/// Profiles, availability and reviews
pub mod services;

/// Background hold expiry
pub mod sweeper;

/// Notification events and templates
pub mod templates;

pub use dispatcher::NotificationDispatcher;
pub use mailer::{ConsoleMailer, ResendMailer};
pub use memory::{InMemoryBookingStore, InMemoryDirectory, InMemoryProposalStore, InMemoryReviewStore};
pub use metrics::MetricsServer;
pub use orchestrator::{BookingOrchestrator, BookingSettings, ProposalDraft};
pub use payment::{MockPaymentGateway, StripeGateway};
pub use retry::RetryPolicy;
pub use services::{AvailabilityService, MentorInput, ProfileInput, ProfileService, ReviewService};
pub use sweeper::HoldSweeper;
pub use templates::BookingEvent;
