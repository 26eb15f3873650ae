//! # Mentorship Core
//!
//! Domain model for mentorship booking.
//!
//! This crate holds the pure part of the system: values, validation, the
//! appointment lifecycle and free/busy computation, plus the traits that
//! storage backends implement. It performs no I/O.
//!
//! ## Core Concepts
//!
//! - **`TimeRange`**: half-open `[start, end)` interval with `start < end`
//! - **Hold**: provisional lock on a mentor's time while payment is pending
//! - **Appointment**: durable booking whose status follows [`lifecycle`]
//! - **Stores**: [`providers`] traits, injected as `Arc<dyn Trait>`
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - One write path per invariant: overlap checks live in the stores
//! - Dependency Injection via Environment ([`environment::Clock`])
//!
//! ## Example
//!
//! ```
//! use mentorship_core::{lifecycle, AppointmentStatus, BookingError};
//!
//! assert_eq!(
//!     lifecycle::confirm(AppointmentStatus::Pending),
//!     Ok(AppointmentStatus::Confirmed)
//! );
//! assert!(matches!(
//!     lifecycle::confirm(AppointmentStatus::Canceled),
//!     Err(BookingError::ConfirmationFailed { .. })
//! ));
//! ```

pub mod availability;
pub mod environment;
pub mod error;
pub mod gateways;
pub mod lifecycle;
pub mod providers;
pub mod time_range;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub use availability::{AvailabilityWindow, FreeBusy};
pub use environment::{Clock, SystemClock};
pub use error::{BookingError, ConflictKind, Result};
pub use gateways::{
    CheckoutRequest, CheckoutSession, DeliveryError, EmailMessage, Mailer, PaymentGateway,
    PaymentGatewayError,
};
pub use providers::{
    AppointmentStore, AvailabilityStore, HoldLedger, ProfileDirectory, ProposalStore, Reservation,
    ReviewStore, SweepOutcome,
};
pub use time_range::TimeRange;
pub use types::{
    Appointment, AppointmentDraft, AppointmentId, AppointmentStatus, AppointmentUpdate, Hold,
    HoldId, MentorProfile, Money, NewAppointment, PaymentConfirmation, ProposalId,
    RescheduleProposal, Review, ReviewId, ServiceType, UserId, UserProfile,
};
