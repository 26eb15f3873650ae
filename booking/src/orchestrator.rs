//! Booking orchestrator.
//!
//! Coordinates validation, the atomic hold+appointment reservation, status
//! transitions, reschedule proposals and checkout. Every state change is
//! committed by the store first; notifications are queued afterwards and can
//! never undo it.

use crate::dispatcher::NotificationDispatcher;
use crate::metrics;
use crate::templates::BookingEvent;
use mentorship_core::environment::Clock;
use mentorship_core::error::{BookingError, Result};
use mentorship_core::gateways::{CheckoutRequest, CheckoutSession, PaymentGateway};
use mentorship_core::providers::{AppointmentStore, ProfileDirectory, ProposalStore, SweepOutcome};
use mentorship_core::time_range::TimeRange;
use mentorship_core::types::{
    Appointment, AppointmentDraft, AppointmentId, AppointmentStatus, AppointmentUpdate,
    PaymentConfirmation, ProposalId, RescheduleProposal, ServiceType, UserId,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Most alternatives a single reschedule proposal may offer.
pub const MAX_PROPOSED_RANGES: usize = 10;

/// Booking policy knobs.
#[derive(Clone, Debug)]
pub struct BookingSettings {
    /// Service types offered at no cost; booked with price 0 and confirmed
    /// immediately.
    pub free_service_types: HashSet<String>,
    /// How long a pending appointment's hold blocks the slot. Must match the
    /// TTL the store was built with; checkout sessions expire with the hold.
    pub hold_ttl: chrono::Duration,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            free_service_types: HashSet::from(["coffee_chat".to_string()]),
            hold_ttl: chrono::Duration::minutes(30),
        }
    }
}

impl BookingSettings {
    /// `true` if `service` is a no-cost offering.
    #[must_use]
    pub fn is_free(&self, service: &ServiceType) -> bool {
        self.free_service_types.contains(service.as_str())
    }
}

/// A reschedule request before validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalDraft {
    /// Appointment to move
    pub appointment_id: AppointmentId,
    /// `[start, end]` RFC 3339 pairs
    pub proposed_time_ranges: Vec<(String, String)>,
    /// Party who must accept
    pub receiver: UserId,
    /// Party proposing
    pub proposer: UserId,
}

/// Coordinates the booking workflow.
pub struct BookingOrchestrator {
    appointments: Arc<dyn AppointmentStore>,
    directory: Arc<dyn ProfileDirectory>,
    proposals: Arc<dyn ProposalStore>,
    payments: Arc<dyn PaymentGateway>,
    notifier: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    settings: BookingSettings,
}

impl BookingOrchestrator {
    /// Wire the orchestrator to its collaborators.
    #[must_use]
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        directory: Arc<dyn ProfileDirectory>,
        proposals: Arc<dyn ProposalStore>,
        payments: Arc<dyn PaymentGateway>,
        notifier: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        settings: BookingSettings,
    ) -> Self {
        Self {
            appointments,
            directory,
            proposals,
            payments,
            notifier,
            clock,
            settings,
        }
    }

    /// The dispatcher notifications are queued on.
    #[must_use]
    pub const fn notifier(&self) -> &NotificationDispatcher {
        &self.notifier
    }

    // ========================================================================
    // Booking
    // ========================================================================

    /// Book a session on behalf of `actor`, who must be the mentee.
    ///
    /// Free service types are confirmed and marked paid immediately, without
    /// any payment call. Paid bookings stay pending behind a hold until
    /// [`Self::confirm_paid`] runs.
    ///
    /// # Errors
    ///
    /// - `Validation` / `InvalidRange` for malformed input
    /// - `Unauthorized` if `actor` is not the mentee
    /// - `NotFound` if the mentor (or their mentor profile) or mentee is unknown
    /// - `Conflict(SlotHeld | SlotBooked)` if the slot is taken
    pub async fn book(&self, draft: AppointmentDraft, actor: &UserId) -> Result<Appointment> {
        let input = draft.validate()?;

        if &input.mentee_id != actor {
            return Err(BookingError::Unauthorized(
                "you can only book sessions for yourself".to_string(),
            ));
        }
        if input.mentor_id == input.mentee_id {
            return Err(BookingError::Validation(
                "mentor and mentee must be different users".to_string(),
            ));
        }
        if input.time_range.start() <= self.clock.now() {
            return Err(BookingError::Validation(
                "cannot book a time slot in the past".to_string(),
            ));
        }

        let free = self.settings.is_free(&input.service_type);
        if free && !input.price.is_zero() {
            return Err(BookingError::Validation(format!(
                "{} is free; price must be 0",
                input.service_type
            )));
        }
        if !free && input.price.is_zero() {
            return Err(BookingError::Validation(format!(
                "{} requires a price",
                input.service_type
            )));
        }

        let (mentor_user, mentor_profile, mentee_user) = tokio::join!(
            self.directory.get_user(&input.mentor_id),
            self.directory.get_mentor(&input.mentor_id),
            self.directory.get_user(&input.mentee_id),
        );
        let (Some(_), Some(mentor_profile)) = (mentor_user?, mentor_profile?) else {
            return Err(BookingError::not_found("mentor", &input.mentor_id));
        };
        if mentee_user?.is_none() {
            return Err(BookingError::not_found("user", &input.mentee_id));
        }
        if !mentor_profile.services.is_empty()
            && !mentor_profile.services.contains(&input.service_type)
        {
            return Err(BookingError::Validation(format!(
                "this mentor does not offer {}",
                input.service_type
            )));
        }

        let started = Instant::now();
        let reservation = match self.appointments.reserve(input).await {
            Ok(reservation) => reservation,
            Err(e) => {
                if let Some(kind) = e.conflict_kind() {
                    metrics::record_conflict(kind);
                    info!(conflict = kind.as_str(), "Booking rejected: slot unavailable");
                }
                return Err(e);
            }
        };
        metrics::record_reservation(started.elapsed());

        let appointment = reservation.appointment;
        info!(
            appointment_id = %appointment.id,
            mentor_id = %appointment.mentor_id,
            mentee_id = %appointment.mentee_id,
            range = %appointment.time_range,
            free,
            "Appointment reserved"
        );

        if free {
            return match self.confirm_paid(appointment.id).await? {
                PaymentConfirmation::Recorded(a) | PaymentConfirmation::AlreadyPaid(a) => Ok(a),
            };
        }

        self.notifier.notify(BookingEvent::Requested(appointment.clone()));
        Ok(appointment)
    }

    /// Create a hosted checkout session for a pending, priced appointment.
    ///
    /// # Errors
    ///
    /// - `NotFound` / `Unauthorized` (only the mentee pays)
    /// - `ConfirmationFailed` if the appointment is no longer pending
    /// - `Validation` for free appointments
    /// - `Downstream` if the payment processor fails
    pub async fn begin_checkout(&self, id: AppointmentId, actor: &UserId) -> Result<CheckoutSession> {
        let appointment = self.load(id).await?;
        if &appointment.mentee_id != actor {
            return Err(BookingError::Unauthorized(
                "only the mentee can pay for an appointment".to_string(),
            ));
        }
        if appointment.status != AppointmentStatus::Pending || appointment.paid_at.is_some() {
            return Err(BookingError::ConfirmationFailed {
                status: appointment.status,
            });
        }
        if appointment.price.is_zero() {
            return Err(BookingError::Validation(
                "free sessions do not need payment".to_string(),
            ));
        }
        let hold_expires_at = appointment.created_at + self.settings.hold_ttl;
        if hold_expires_at <= self.clock.now() {
            return Err(BookingError::Validation(
                "this reservation has expired; please book again".to_string(),
            ));
        }

        let mentee_email = self
            .directory
            .get_user(&appointment.mentee_id)
            .await?
            .map(|profile| profile.email);

        let session = self
            .payments
            .create_checkout(CheckoutRequest {
                appointment_id: appointment.id,
                amount: appointment.price,
                description: format!(
                    "{} on {}",
                    appointment.service_type.as_str().replace('_', " "),
                    appointment.time_range.start().format("%Y-%m-%d %H:%M UTC")
                ),
                customer_email: mentee_email,
                expires_at: Some(hold_expires_at),
            })
            .await
            .map_err(|e| BookingError::downstream("create checkout session", e))?;

        info!(appointment_id = %id, session_id = %session.session_id, "Checkout started");
        Ok(session)
    }

    // ========================================================================
    // Status transitions
    // ========================================================================

    /// Confirm a pending appointment (mentor only); releases its hold.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized` or `ConfirmationFailed`.
    pub async fn confirm(&self, id: AppointmentId, actor: &UserId) -> Result<Appointment> {
        let appointment = self.load(id).await?;
        ensure_mentor(&appointment, actor, "confirm")?;

        let confirmed = self.appointments.confirm(id).await?;
        metrics::record_transition(AppointmentStatus::Confirmed);
        info!(appointment_id = %id, "Appointment confirmed");

        self.notifier.notify(BookingEvent::Confirmed(confirmed.clone()));
        Ok(confirmed)
    }

    /// Record payment for an appointment. Idempotent: a repeated call reports
    /// `AlreadyPaid` and sends nothing. A payment for an appointment that was
    /// canceled in the meantime is logged at error level and counted in
    /// `booking_payments_refund_required_total`.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `ConfirmationFailed` for unpaid terminal appointments.
    pub async fn confirm_paid(&self, id: AppointmentId) -> Result<PaymentConfirmation> {
        let before = self.load(id).await?.status;
        let outcome = match self.appointments.confirm_paid(id).await {
            Ok(outcome) => outcome,
            Err(BookingError::ConfirmationFailed { status }) => {
                metrics::record_refund_required(status);
                error!(
                    appointment_id = %id,
                    status = %status,
                    "Payment received for an appointment that can no longer be confirmed; refund required"
                );
                return Err(BookingError::ConfirmationFailed { status });
            }
            Err(e) => return Err(e),
        };

        match &outcome {
            PaymentConfirmation::Recorded(appointment) => {
                metrics::record_payment(false);
                if before != appointment.status {
                    metrics::record_transition(appointment.status);
                }
                info!(appointment_id = %id, "Payment recorded");
                self.notifier.notify(BookingEvent::Paid(appointment.clone()));
            }
            PaymentConfirmation::AlreadyPaid(_) => {
                metrics::record_payment(true);
                info!(appointment_id = %id, "Payment already recorded, ignoring duplicate");
            }
        }
        Ok(outcome)
    }

    /// Cancel a pending or confirmed appointment (either party).
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized` or `InvalidTransition`.
    pub async fn cancel(&self, id: AppointmentId, actor: &UserId) -> Result<Appointment> {
        let appointment = self.load(id).await?;
        ensure_party(&appointment, actor)?;

        let canceled = self.appointments.cancel(id).await?;
        metrics::record_transition(AppointmentStatus::Canceled);
        info!(appointment_id = %id, canceled_by = %actor, "Appointment canceled");

        self.discard_proposals(id).await;
        self.notifier.notify(BookingEvent::Canceled {
            appointment: canceled.clone(),
            by: Some(actor.clone()),
        });
        Ok(canceled)
    }

    /// Mark a confirmed appointment completed (mentor only).
    ///
    /// # Errors
    ///
    /// See [`Self::update`].
    pub async fn complete(&self, id: AppointmentId, actor: &UserId) -> Result<Appointment> {
        self.update(
            id,
            AppointmentUpdate {
                status: Some(AppointmentStatus::Completed),
                time_range: None,
            },
            actor,
        )
        .await
    }

    /// Mark a confirmed appointment as a no-show (mentor only).
    ///
    /// # Errors
    ///
    /// See [`Self::update`].
    pub async fn mark_no_show(&self, id: AppointmentId, actor: &UserId) -> Result<Appointment> {
        self.update(
            id,
            AppointmentUpdate {
                status: Some(AppointmentStatus::NoShow),
                time_range: None,
            },
            actor,
        )
        .await
    }

    /// Generic status/time-range update.
    ///
    /// Closed to pending appointments. Completion and no-show can only be
    /// recorded by the mentor.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`, `Validation`, transition errors, or
    /// `Conflict` when a new time range overlaps another booking.
    pub async fn update(
        &self,
        id: AppointmentId,
        update: AppointmentUpdate,
        actor: &UserId,
    ) -> Result<Appointment> {
        let before = self.load(id).await?;
        ensure_party(&before, actor)?;
        if matches!(
            update.status,
            Some(AppointmentStatus::Completed | AppointmentStatus::NoShow)
        ) {
            ensure_mentor(&before, actor, "record attendance for")?;
        }

        let after = match self.appointments.update(id, update).await {
            Ok(after) => after,
            Err(e) => {
                if let Some(kind) = e.conflict_kind() {
                    metrics::record_conflict(kind);
                }
                return Err(e);
            }
        };

        if after.status != before.status {
            metrics::record_transition(after.status);
            info!(appointment_id = %id, from = %before.status, to = %after.status, "Appointment status changed");
        }
        if after.status == AppointmentStatus::Canceled && before.status != AppointmentStatus::Canceled {
            self.discard_proposals(id).await;
            self.notifier.notify(BookingEvent::Canceled {
                appointment: after.clone(),
                by: Some(actor.clone()),
            });
        } else if after.time_range != before.time_range {
            info!(appointment_id = %id, range = %after.time_range, "Appointment rescheduled");
            self.notifier.notify(BookingEvent::Rescheduled(after.clone()));
        }
        Ok(after)
    }

    // ========================================================================
    // Rescheduling
    // ========================================================================

    /// Offer alternative times for a confirmed appointment.
    ///
    /// The appointment itself is untouched until the receiver accepts.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `actor` is the proposer, `Validation` for bad
    /// ranges or parties, `NotFound` for unknown appointments.
    pub async fn propose_reschedule(
        &self,
        draft: ProposalDraft,
        actor: &UserId,
    ) -> Result<RescheduleProposal> {
        if &draft.proposer != actor {
            return Err(BookingError::Unauthorized(
                "proposer must be the signed-in user".to_string(),
            ));
        }
        let ranges = parse_ranges(&draft.proposed_time_ranges)?;

        let appointment = self.load(draft.appointment_id).await?;
        if appointment.counterpart(&draft.proposer) != Some(&draft.receiver) {
            return Err(BookingError::Validation(
                "proposer and receiver must be the two parties of the appointment".to_string(),
            ));
        }
        if appointment.status != AppointmentStatus::Confirmed {
            return Err(BookingError::Validation(format!(
                "cannot reschedule a {} appointment",
                appointment.status
            )));
        }

        let proposal = self
            .proposals
            .replace(RescheduleProposal {
                id: ProposalId::new(),
                appointment_id: appointment.id,
                proposed_time_ranges: ranges,
                receiver: draft.receiver,
                proposer: draft.proposer,
                proposed_at: self.clock.now(),
            })
            .await?;

        info!(
            appointment_id = %appointment.id,
            proposal_id = %proposal.id,
            options = proposal.proposed_time_ranges.len(),
            "Reschedule proposed"
        );
        self.notifier.notify(BookingEvent::RescheduleProposed {
            appointment,
            proposal: proposal.clone(),
        });
        Ok(proposal)
    }

    /// Proposals awaiting `receiver`.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `actor` is the receiver.
    pub async fn list_proposals(&self, receiver: &UserId, actor: &UserId) -> Result<Vec<RescheduleProposal>> {
        if receiver != actor {
            return Err(BookingError::Unauthorized(
                "you can only list your own proposals".to_string(),
            ));
        }
        self.proposals.list_for_receiver(receiver).await
    }

    /// Accept option `index` of a proposal: the appointment moves through the
    /// generic update path and the appointment's proposals are deleted.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized` unless `actor` is the receiver,
    /// `Validation` for an out-of-range index, or any error of
    /// [`Self::update`] (notably `Conflict`).
    pub async fn accept_proposal(
        &self,
        proposal_id: ProposalId,
        index: usize,
        actor: &UserId,
    ) -> Result<Appointment> {
        let proposal = self
            .proposals
            .get(proposal_id)
            .await?
            .ok_or_else(|| BookingError::not_found("reschedule proposal", proposal_id))?;
        if &proposal.receiver != actor {
            return Err(BookingError::Unauthorized(
                "only the receiver can accept a proposal".to_string(),
            ));
        }
        let range = *proposal.proposed_time_ranges.get(index).ok_or_else(|| {
            BookingError::Validation(format!(
                "index must be below {}",
                proposal.proposed_time_ranges.len()
            ))
        })?;

        let moved = self
            .update(
                proposal.appointment_id,
                AppointmentUpdate {
                    status: None,
                    time_range: Some(range),
                },
                actor,
            )
            .await?;
        self.discard_proposals(proposal.appointment_id).await;
        Ok(moved)
    }

    // ========================================================================
    // Queries and maintenance
    // ========================================================================

    /// Fetch an appointment visible to `actor`.
    ///
    /// # Errors
    ///
    /// `NotFound` or `Unauthorized`.
    pub async fn get(&self, id: AppointmentId, actor: &UserId) -> Result<Appointment> {
        let appointment = self.load(id).await?;
        ensure_party(&appointment, actor)?;
        Ok(appointment)
    }

    /// Every appointment of `user`, newest first.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `actor` is `user`.
    pub async fn list_for_user(&self, user: &UserId, actor: &UserId) -> Result<Vec<Appointment>> {
        if user != actor {
            return Err(BookingError::Unauthorized(
                "you can only list your own appointments".to_string(),
            ));
        }
        self.appointments.list_for_user(user).await
    }

    /// Release stale holds everywhere and notify parties of pending
    /// appointments canceled as a result.
    ///
    /// # Errors
    ///
    /// `Downstream` on store failure.
    pub async fn expire_stale_holds(&self) -> Result<SweepOutcome> {
        let outcome = self.appointments.expire_stale_holds().await?;
        metrics::record_sweep(outcome.released_holds);
        if outcome.released_holds > 0 {
            info!(
                released = outcome.released_holds,
                canceled = outcome.canceled.len(),
                "Stale holds expired"
            );
        }
        for appointment in &outcome.canceled {
            metrics::record_transition(AppointmentStatus::Canceled);
            self.notifier.notify(BookingEvent::Canceled {
                appointment: appointment.clone(),
                by: None,
            });
        }
        Ok(outcome)
    }

    async fn load(&self, id: AppointmentId) -> Result<Appointment> {
        self.appointments
            .get(id)
            .await?
            .ok_or_else(|| BookingError::not_found("appointment", id))
    }

    async fn discard_proposals(&self, id: AppointmentId) {
        if let Err(e) = self.proposals.delete_for_appointment(id).await {
            warn!(appointment_id = %id, error = %e, "Failed to delete reschedule proposals");
        }
    }
}

fn ensure_party(appointment: &Appointment, actor: &UserId) -> Result<()> {
    if appointment.involves(actor) {
        Ok(())
    } else {
        Err(BookingError::Unauthorized(
            "you are not a party to this appointment".to_string(),
        ))
    }
}

fn ensure_mentor(appointment: &Appointment, actor: &UserId, action: &str) -> Result<()> {
    if &appointment.mentor_id == actor {
        Ok(())
    } else {
        Err(BookingError::Unauthorized(format!(
            "only the mentor can {action} this appointment"
        )))
    }
}

fn parse_ranges(raw: &[(String, String)]) -> Result<Vec<TimeRange>> {
    if raw.is_empty() {
        return Err(BookingError::Validation(
            "proposed_time_ranges must not be empty".to_string(),
        ));
    }
    if raw.len() > MAX_PROPOSED_RANGES {
        return Err(BookingError::Validation(format!(
            "at most {MAX_PROPOSED_RANGES} time ranges can be proposed"
        )));
    }
    raw.iter()
        .enumerate()
        .map(|(i, (start, end))| {
            TimeRange::parse(start, end).map_err(|e| {
                BookingError::Validation(format!("proposed_time_ranges[{i}]: {e}"))
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pair(start: &str, end: &str) -> (String, String) {
        (start.to_string(), end.to_string())
    }

    #[test]
    fn ranges_are_validated_independently() {
        let err = parse_ranges(&[
            pair("2025-03-03T10:00:00Z", "2025-03-03T11:00:00Z"),
            pair("2025-03-03T12:00:00Z", "2025-03-03T11:00:00Z"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            BookingError::Validation("proposed_time_ranges[1]: invalid time range".to_string())
        );

        assert!(parse_ranges(&[]).is_err());
        assert_eq!(
            parse_ranges(&[pair("2025-03-03T10:00:00Z", "2025-03-03T11:00:00Z")])
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn coffee_chat_is_free_by_default() {
        let settings = BookingSettings::default();
        assert!(settings.is_free(&ServiceType::parse("coffee_chat").unwrap()));
        assert!(!settings.is_free(&ServiceType::parse("mock_interview").unwrap()));
    }
}
