//! Appointment lifecycle state machine.
//!
//! Pure functions deciding whether a status change is legal. Stores call these
//! inside their atomic sections so the decision and the write see the same
//! row.
//!
//! ```text
//! pending   --confirm-->  confirmed
//! pending   --cancel--->  canceled
//! confirmed --complete->  completed
//! confirmed --cancel--->  canceled
//! confirmed --noshow--->  noshow
//! ```

use crate::error::{BookingError, Result};
use crate::time_range::TimeRange;
use crate::types::{AppointmentStatus, AppointmentUpdate};
use chrono::{DateTime, Utc};

use AppointmentStatus::{Canceled, Completed, Confirmed, NoShow, Pending};

/// `true` if the lifecycle has an edge `from -> to`.
#[must_use]
pub const fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    matches!(
        (from, to),
        (Pending, Confirmed | Canceled) | (Confirmed, Completed | Canceled | NoShow)
    )
}

/// Check a single edge.
///
/// # Errors
///
/// Returns [`BookingError::InvalidTransition`] when no such edge exists.
pub const fn transition(from: AppointmentStatus, to: AppointmentStatus) -> Result<AppointmentStatus> {
    if can_transition(from, to) {
        Ok(to)
    } else {
        Err(BookingError::InvalidTransition { from, to })
    }
}

/// The explicit confirm path: only pending appointments qualify.
///
/// # Errors
///
/// Returns [`BookingError::ConfirmationFailed`] for any other status.
pub const fn confirm(from: AppointmentStatus) -> Result<AppointmentStatus> {
    match from {
        Pending => Ok(Confirmed),
        status => Err(BookingError::ConfirmationFailed { status }),
    }
}

/// Cancel from any non-terminal status.
///
/// # Errors
///
/// Returns [`BookingError::InvalidTransition`] for terminal statuses.
pub const fn cancel(from: AppointmentStatus) -> Result<AppointmentStatus> {
    transition(from, Canceled)
}

/// What recording a payment should do to an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStep {
    /// Pending: confirm, release the hold, stamp `paid_at`
    ConfirmAndRecord,
    /// Confirmed but unpaid: only stamp `paid_at`
    RecordOnly,
    /// `paid_at` already set: do nothing
    AlreadyPaid,
}

/// Decide the pay-confirmation step.
///
/// # Errors
///
/// Returns [`BookingError::ConfirmationFailed`] for unpaid appointments in a
/// terminal status.
pub fn pay_confirmation(
    status: AppointmentStatus,
    paid_at: Option<DateTime<Utc>>,
) -> Result<PaymentStep> {
    if paid_at.is_some() {
        return Ok(PaymentStep::AlreadyPaid);
    }
    match status {
        Pending => Ok(PaymentStep::ConfirmAndRecord),
        Confirmed => Ok(PaymentStep::RecordOnly),
        Completed | Canceled | NoShow => Err(BookingError::ConfirmationFailed { status }),
    }
}

/// A vetted generic update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Status to write, if it changes
    pub status: Option<AppointmentStatus>,
    /// Range to write, if it changes. Subject to the overlap check.
    pub time_range: Option<TimeRange>,
}

impl UpdatePlan {
    /// `true` if the update cancels the appointment, which must free its hold.
    #[must_use]
    pub const fn cancels(&self) -> bool {
        matches!(self.status, Some(Canceled))
    }
}

/// Vet a generic update against the current status.
///
/// Pending appointments are closed to the generic path; they move only
/// through confirm or cancel. `pending` is never an accepted target.
///
/// # Errors
///
/// - [`BookingError::PendingUpdate`] if `current` is pending
/// - [`BookingError::Validation`] for an empty update, a `pending` target, or a
///   reschedule of a terminal appointment
/// - [`BookingError::InvalidTransition`] for an illegal edge
pub fn plan_update(current: AppointmentStatus, update: &AppointmentUpdate) -> Result<UpdatePlan> {
    if current == Pending {
        return Err(BookingError::PendingUpdate);
    }
    if update.is_empty() {
        return Err(BookingError::Validation(
            "nothing to update: provide status or time_slot".to_string(),
        ));
    }

    let status = match update.status {
        None => None,
        Some(Pending) => {
            return Err(BookingError::Validation(
                "status must be one of confirmed, completed, canceled, noshow".to_string(),
            ));
        }
        Some(target) if target == current => None,
        Some(target) => Some(transition(current, target)?),
    };

    if update.time_range.is_some() && current.is_terminal() {
        return Err(BookingError::Validation(format!(
            "cannot reschedule a {current} appointment"
        )));
    }

    Ok(UpdatePlan {
        status,
        time_range: update.time_range,
    })
}
