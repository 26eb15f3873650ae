//! Storage traits.
//!
//! Backends implement these traits: the in-memory backend in
//! `mentorship-booking` and the `PostgreSQL` backend in `mentorship-postgres`.
//! Services receive them as `Arc<dyn Trait>` through their constructors.

use crate::availability::AvailabilityWindow;
use crate::error::Result;
use crate::time_range::TimeRange;
use crate::types::{
    Appointment, AppointmentId, AppointmentUpdate, Hold, MentorProfile, NewAppointment,
    PaymentConfirmation, ProposalId, RescheduleProposal, Review, ReviewId, UserId, UserProfile,
};
use async_trait::async_trait;

/// A pending appointment together with the hold protecting its slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reservation {
    /// The new pending appointment
    pub appointment: Appointment,
    /// The active hold created with it
    pub hold: Hold,
}

/// Result of a stale-hold sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Holds whose TTL had elapsed and are now released
    pub released_holds: usize,
    /// Pending appointments canceled because their hold went stale
    pub canceled: Vec<Appointment>,
}

/// Provisional reservations of a mentor's time.
///
/// Holds older than the backend's TTL are treated as inactive even before
/// they are released.
#[async_trait]
pub trait HoldLedger: Send + Sync {
    /// Take a standalone hold on `range`.
    ///
    /// # Errors
    ///
    /// Returns `Conflict(SlotHeld)` if an active hold for the mentor overlaps.
    async fn acquire(&self, mentor_id: &UserId, mentee_id: &UserId, range: TimeRange)
    -> Result<Hold>;

    /// Release active holds of `mentor_id` covering exactly `range`.
    ///
    /// Returns how many holds were released; zero is not an error.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn release(&self, mentor_id: &UserId, range: &TimeRange) -> Result<usize>;

    /// Active, non-stale holds of a mentor.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn list_active(&self, mentor_id: &UserId) -> Result<Vec<Hold>>;
}

/// Durable appointment records.
///
/// Every write that can introduce an overlap (`create`, `reserve`, and
/// `update` with a time range) checks and writes atomically.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Insert a pending appointment without a hold.
    ///
    /// # Errors
    ///
    /// Returns `Conflict(SlotBooked)` if a non-canceled appointment of the
    /// mentor overlaps.
    async fn create(&self, input: NewAppointment) -> Result<Appointment>;

    /// Insert a pending appointment and its hold in one atomic step.
    ///
    /// Stale holds of the mentor are released first and their pending
    /// appointments canceled.
    ///
    /// # Errors
    ///
    /// Returns `Conflict(SlotHeld)` for an overlapping active hold and
    /// `Conflict(SlotBooked)` for an overlapping appointment.
    async fn reserve(&self, input: NewAppointment) -> Result<Reservation>;

    /// Look up an appointment.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>>;

    /// Generic status/time-range update, vetted by
    /// [`crate::lifecycle::plan_update`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, transition errors, or `Conflict(SlotBooked)` when the
    /// new range overlaps another appointment.
    async fn update(&self, id: AppointmentId, update: AppointmentUpdate) -> Result<Appointment>;

    /// Pending to confirmed; releases the hold.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `ConfirmationFailed`.
    async fn confirm(&self, id: AppointmentId) -> Result<Appointment>;

    /// Record payment, confirming a pending appointment. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `ConfirmationFailed` for terminal statuses.
    async fn confirm_paid(&self, id: AppointmentId) -> Result<PaymentConfirmation>;

    /// Cancel a pending or confirmed appointment; releases the hold.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `InvalidTransition`.
    async fn cancel(&self, id: AppointmentId) -> Result<Appointment>;

    /// Non-canceled appointments of a mentor overlapping `window`.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn list_for_mentor(&self, mentor_id: &UserId, window: &TimeRange)
    -> Result<Vec<Appointment>>;

    /// Every appointment where `user` is mentor or mentee, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Appointment>>;

    /// Release every stale hold and cancel its pending appointment.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn expire_stale_holds(&self) -> Result<SweepOutcome>;
}

/// User and mentor profiles.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Look up a user profile.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn get_user(&self, user_id: &UserId) -> Result<Option<UserProfile>>;

    /// Look up a mentor profile.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn get_mentor(&self, user_id: &UserId) -> Result<Option<MentorProfile>>;

    /// Insert or replace a user profile, keeping the original `created_at`.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn upsert_user(&self, profile: UserProfile) -> Result<UserProfile>;

    /// Insert or replace a mentor profile.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn upsert_mentor(&self, profile: MentorProfile) -> Result<MentorProfile>;
}

/// Mentors' weekly schedules.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// The mentor's windows; empty if none were published.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn schedule(&self, mentor_id: &UserId) -> Result<Vec<AvailabilityWindow>>;

    /// Replace the mentor's whole schedule.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn replace_schedule(&self, mentor_id: &UserId, windows: Vec<AvailabilityWindow>)
    -> Result<()>;
}

/// Reschedule proposals.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Store a proposal, deleting earlier proposals for the same appointment.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn replace(&self, proposal: RescheduleProposal) -> Result<RescheduleProposal>;

    /// Look up a proposal.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn get(&self, id: ProposalId) -> Result<Option<RescheduleProposal>>;

    /// Proposals awaiting `receiver`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn list_for_receiver(&self, receiver: &UserId) -> Result<Vec<RescheduleProposal>>;

    /// Delete all proposals of an appointment, returning how many went.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn delete_for_appointment(&self, appointment_id: AppointmentId) -> Result<usize>;
}

/// Reviews between users.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Persist a validated review.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn insert(&self, review: Review) -> Result<Review>;

    /// Look up a review.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn get(&self, id: ReviewId) -> Result<Option<Review>>;

    /// Delete a review; `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn delete(&self, id: ReviewId) -> Result<bool>;

    /// Reviews about `reviewee`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Downstream` on backend failure.
    async fn list_for_reviewee(&self, reviewee: &UserId) -> Result<Vec<Review>>;
}
