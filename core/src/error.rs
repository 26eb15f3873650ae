//! Error taxonomy for booking operations.

use crate::types::AppointmentStatus;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// Which kind of reservation blocks a requested slot.
///
/// Clients render different messaging for the two, so they are never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// An active hold covers the slot while another mentee pays.
    SlotHeld,
    /// A non-canceled appointment already occupies the slot.
    SlotBooked,
}

impl ConflictKind {
    /// Label used in metrics and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SlotHeld => "held",
            Self::SlotBooked => "booked",
        }
    }

    /// User-facing explanation.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::SlotHeld => "this time slot is temporarily reserved",
            Self::SlotBooked => "this time slot is already booked",
        }
    }
}

/// Every failure mode of the booking core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BookingError {
    // ═══════════════════════════════════════════════════════════
    // Caller errors
    // ═══════════════════════════════════════════════════════════

    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// A time range whose end does not come after its start.
    #[error("invalid time range")]
    InvalidRange {
        /// Requested start
        start: DateTime<Utc>,
        /// Requested end
        end: DateTime<Utc>,
    },

    /// Entity absent from the store.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind, e.g. "appointment"
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The session identity does not match the identity the request acts for.
    #[error("{0}")]
    Unauthorized(String),

    // ═══════════════════════════════════════════════════════════
    // Scheduling conflicts
    // ═══════════════════════════════════════════════════════════

    /// The requested slot is unavailable.
    #[error("{}", .0.message())]
    Conflict(ConflictKind),

    // ═══════════════════════════════════════════════════════════
    // Lifecycle errors
    // ═══════════════════════════════════════════════════════════

    /// A status change that the lifecycle does not allow.
    #[error("cannot change appointment status from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: AppointmentStatus,
        /// Requested status
        to: AppointmentStatus,
    },

    /// A generic update attempted on a pending appointment.
    #[error("pending appointments must be confirmed before they can be updated")]
    PendingUpdate,

    /// Confirmation attempted on an appointment that is not awaiting it.
    #[error("appointment cannot be confirmed while {status}")]
    ConfirmationFailed {
        /// Current status
        status: AppointmentStatus,
    },

    // ═══════════════════════════════════════════════════════════
    // System errors
    // ═══════════════════════════════════════════════════════════

    /// Store, RPC or provider failure. The message is for logs only.
    #[error("downstream failure: {0}")]
    Downstream(String),
}

impl BookingError {
    /// Shorthand for [`BookingError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a downstream failure wrapping any displayable error.
    #[must_use]
    pub fn downstream(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Downstream(format!("{context}: {err}"))
    }

    /// `true` for errors caused by the caller's input or identity.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mentorship_core::error::BookingError;
    /// assert!(BookingError::Validation("price is required".into()).is_user_error());
    /// assert!(!BookingError::Downstream("pool timed out".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Downstream(_))
    }

    /// The conflict kind, if this is a scheduling conflict.
    #[must_use]
    pub const fn conflict_kind(&self) -> Option<ConflictKind> {
        match self {
            Self::Conflict(kind) => Some(*kind),
            _ => None,
        }
    }

    /// `true` for lifecycle violations (bad transitions, confirmation gate).
    #[must_use]
    pub const fn is_transition_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. } | Self::PendingUpdate | Self::ConfirmationFailed { .. }
        )
    }
}
