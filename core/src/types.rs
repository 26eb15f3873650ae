//! Domain types for mentorship booking.
//!
//! Identifiers, money, appointment lifecycle status, and the entities that the
//! stores persist: appointments, holds, reschedule proposals, reviews and
//! profiles.

use crate::error::{BookingError, Result};
use crate::time_range::TimeRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing `Uuid`
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = BookingError;

            fn from_str(s: &str) -> Result<Self> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|_| {
                    BookingError::Validation(format!("{s:?} is not a valid {}", stringify!($name)))
                })
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an appointment
    AppointmentId
);
uuid_id!(
    /// Unique identifier for a hold
    HoldId
);
uuid_id!(
    /// Unique identifier for a reschedule proposal
    ProposalId
);
uuid_id!(
    /// Unique identifier for a review
    ReviewId
);

/// Identity-provider user id (opaque string such as `user_2aXk...`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a non-empty user id.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for blank ids.
    pub fn parse(field: &str, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BookingError::Validation(format!("{field} is required")));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Value objects
// ============================================================================

/// Non-negative amount in cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Creates money from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Get amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Check if amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Kind of session being booked (e.g. `coffee_chat`, `mock_interview`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceType(String);

impl ServiceType {
    /// Normalize a service type name: trimmed and lower-cased.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for blank names.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(BookingError::Validation("service_type is required".to_string()));
        }
        Ok(Self(normalized))
    }

    /// Borrow the normalized name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Appointment
// ============================================================================

/// Lifecycle status of an appointment.
///
/// ```text
/// pending --confirm--> confirmed --complete--> completed
///    |                     |  \
///    +----cancel----> canceled  noshow
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    /// Awaiting payment or confirmation; holds the slot
    Pending,
    /// Confirmed by payment or by the confirm flow
    Confirmed,
    /// Session took place
    Completed,
    /// Canceled by either party or by hold expiry
    Canceled,
    /// Mentee did not show up
    #[serde(rename = "noshow")]
    NoShow,
}

impl AppointmentStatus {
    /// Convert status to its database/wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::NoShow => "noshow",
        }
    }

    /// Parse status from its database/wire representation.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] if the string is not a known status.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "completed" => Ok(Self::Completed),
            "canceled" => Ok(Self::Canceled),
            "noshow" => Ok(Self::NoShow),
            other => Err(BookingError::Validation(format!("unknown status {other:?}"))),
        }
    }

    /// `true` for statuses that accept no further transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::NoShow)
    }

    /// `true` if an appointment in this status occupies its slot.
    #[must_use]
    pub const fn blocks_slot(&self) -> bool {
        !matches!(self, Self::Canceled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booked session between a mentor and a mentee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// Appointment ID
    pub id: AppointmentId,
    /// Mentor being booked
    pub mentor_id: UserId,
    /// Mentee booking the session
    pub mentee_id: UserId,
    /// Scheduled interval
    pub time_range: TimeRange,
    /// Current lifecycle status
    pub status: AppointmentStatus,
    /// Booked service
    pub service_type: ServiceType,
    /// Agreed price
    pub price: Money,
    /// When payment (or free confirmation) was recorded
    pub paid_at: Option<DateTime<Utc>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Materialize a new pending appointment.
    #[must_use]
    pub fn pending(input: NewAppointment, now: DateTime<Utc>) -> Self {
        Self {
            id: AppointmentId::new(),
            mentor_id: input.mentor_id,
            mentee_id: input.mentee_id,
            time_range: input.time_range,
            status: AppointmentStatus::Pending,
            service_type: input.service_type,
            price: input.price,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `true` if `user` is the mentor or the mentee.
    #[must_use]
    pub fn involves(&self, user: &UserId) -> bool {
        &self.mentor_id == user || &self.mentee_id == user
    }

    /// The other party of the appointment, if `user` is one of them.
    #[must_use]
    pub fn counterpart(&self, user: &UserId) -> Option<&UserId> {
        if &self.mentor_id == user {
            Some(&self.mentee_id)
        } else if &self.mentee_id == user {
            Some(&self.mentor_id)
        } else {
            None
        }
    }
}

/// Validated input for creating an appointment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAppointment {
    /// Mentor being booked
    pub mentor_id: UserId,
    /// Mentee booking the session
    pub mentee_id: UserId,
    /// Requested interval
    pub time_range: TimeRange,
    /// Requested service
    pub service_type: ServiceType,
    /// Price in cents
    pub price: Money,
}

/// Raw booking request, every field optional until validated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AppointmentDraft {
    /// Mentor user id
    pub mentor_id: Option<String>,
    /// Mentee user id
    pub mentee_id: Option<String>,
    /// RFC 3339 start
    pub start_time: Option<String>,
    /// RFC 3339 end
    pub end_time: Option<String>,
    /// Service type name
    pub service_type: Option<String>,
    /// Price in cents
    pub price: Option<u64>,
}

impl AppointmentDraft {
    /// Check presence and shape of every field.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] naming the first missing or
    /// malformed field, or [`BookingError::InvalidRange`] for inverted times.
    pub fn validate(self) -> Result<NewAppointment> {
        let mentor_id = UserId::parse("mentor_id", &required(self.mentor_id, "mentor_id")?)?;
        let mentee_id = UserId::parse("mentee_id", &required(self.mentee_id, "mentee_id")?)?;
        let start = required(self.start_time, "start_time")?;
        let end = required(self.end_time, "end_time")?;
        let service_type = ServiceType::parse(&required(self.service_type, "service_type")?)?;
        let price = self
            .price
            .map(Money::from_cents)
            .ok_or_else(|| BookingError::Validation("price is required".to_string()))?;
        let time_range = TimeRange::parse(&start, &end)?;

        Ok(NewAppointment {
            mentor_id,
            mentee_id,
            time_range,
            service_type,
            price,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| BookingError::Validation(format!("{field} is required")))
}

/// Fields accepted by the generic update path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppointmentUpdate {
    /// New status, if changing
    pub status: Option<AppointmentStatus>,
    /// New interval, if rescheduling
    pub time_range: Option<TimeRange>,
}

impl AppointmentUpdate {
    /// `true` if nothing would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none() && self.time_range.is_none()
    }
}

/// Outcome of recording a payment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentConfirmation {
    /// Payment recorded now; notifications should go out
    Recorded(Appointment),
    /// Payment had already been recorded; nothing changed
    AlreadyPaid(Appointment),
}

impl PaymentConfirmation {
    /// The appointment after confirmation.
    #[must_use]
    pub const fn appointment(&self) -> &Appointment {
        match self {
            Self::Recorded(a) | Self::AlreadyPaid(a) => a,
        }
    }
}

// ============================================================================
// Hold
// ============================================================================

/// Provisional lock on a mentor's time range while payment is pending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    /// Hold ID
    pub id: HoldId,
    /// Appointment this hold protects, if created by a booking
    pub appointment_id: Option<AppointmentId>,
    /// Mentor whose time is held
    pub mentor_id: UserId,
    /// Mentee holding it
    pub mentee_id: UserId,
    /// Held interval
    pub time_range: TimeRange,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// `None` while active; set when released or expired
    pub expires_at: Option<DateTime<Utc>>,
}

impl Hold {
    /// Creates a new active hold.
    #[must_use]
    pub fn active(
        appointment_id: Option<AppointmentId>,
        mentor_id: UserId,
        mentee_id: UserId,
        time_range: TimeRange,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HoldId::new(),
            appointment_id,
            mentor_id,
            mentee_id,
            time_range,
            created_at: now,
            expires_at: None,
        }
    }

    /// `true` if the hold still blocks its range at `now` given the TTL.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        self.expires_at.is_none() && !self.is_stale(now, ttl)
    }

    /// `true` if the hold was never released but has outlived the TTL.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        self.expires_at.is_none() && self.created_at + ttl <= now
    }
}

// ============================================================================
// Reschedule proposals
// ============================================================================

/// Alternative time ranges offered by one party of an appointment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleProposal {
    /// Proposal ID
    pub id: ProposalId,
    /// Appointment being rescheduled
    pub appointment_id: AppointmentId,
    /// Candidate ranges, in the proposer's order of preference
    pub proposed_time_ranges: Vec<TimeRange>,
    /// Party who must accept
    pub receiver: UserId,
    /// Party proposing
    pub proposer: UserId,
    /// Proposal time
    pub proposed_at: DateTime<Utc>,
}

// ============================================================================
// Reviews
// ============================================================================

/// Rating and comment left by one user about another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Review ID
    pub id: ReviewId,
    /// User being reviewed
    pub reviewee: UserId,
    /// Author
    pub reviewer: UserId,
    /// Free-text content
    pub content: String,
    /// Rating from 1 to 5
    pub rating: u8,
    /// Creation time
    pub creation_time: DateTime<Utc>,
}

/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

/// Longest accepted review body, in characters.
pub const MAX_REVIEW_LENGTH: usize = 2_000;

impl Review {
    /// Validate and build a review.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for self-reviews, ratings outside
    /// `1..=5`, and blank or oversized content.
    pub fn new(
        reviewee: UserId,
        reviewer: UserId,
        content: &str,
        rating: u8,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if reviewee == reviewer {
            return Err(BookingError::Validation("you cannot review yourself".to_string()));
        }
        if !(1..=MAX_RATING).contains(&rating) {
            return Err(BookingError::Validation(format!(
                "rating must be between 1 and {MAX_RATING}"
            )));
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(BookingError::Validation("content is required".to_string()));
        }
        if content.chars().count() > MAX_REVIEW_LENGTH {
            return Err(BookingError::Validation(format!(
                "content must be at most {MAX_REVIEW_LENGTH} characters"
            )));
        }
        Ok(Self {
            id: ReviewId::new(),
            reviewee,
            reviewer,
            content: content.to_string(),
            rating,
            creation_time: now,
        })
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// Basic account profile mirrored from the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id
    pub user_id: UserId,
    /// Contact address for notifications
    pub email: String,
    /// Name shown to other users
    pub display_name: String,
    /// First time the profile was stored
    pub created_at: DateTime<Utc>,
}

/// Mentor-specific profile. A user is a mentor iff one exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorProfile {
    /// User id
    pub user_id: UserId,
    /// One-line pitch
    pub headline: String,
    /// Longer description
    pub bio: String,
    /// Rate for paid sessions, in cents per hour
    pub hourly_rate: Money,
    /// Services offered
    pub services: Vec<ServiceType>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft() -> AppointmentDraft {
        AppointmentDraft {
            mentor_id: Some("user_mentor".to_string()),
            mentee_id: Some("user_mentee".to_string()),
            start_time: Some("2025-03-03T10:00:00Z".to_string()),
            end_time: Some("2025-03-03T11:00:00Z".to_string()),
            service_type: Some(" Coffee_Chat ".to_string()),
            price: Some(0),
        }
    }

    #[test]
    fn draft_validation_normalizes_fields() {
        let input = draft().validate().unwrap();
        assert_eq!(input.mentor_id.as_str(), "user_mentor");
        assert_eq!(input.service_type.as_str(), "coffee_chat");
        assert!(input.price.is_zero());
    }

    #[test]
    fn draft_validation_names_missing_field() {
        let mut d = draft();
        d.price = None;
        assert_eq!(
            d.validate().unwrap_err(),
            BookingError::Validation("price is required".to_string())
        );

        let mut d = draft();
        d.mentee_id = Some("   ".to_string());
        assert_eq!(
            d.validate().unwrap_err(),
            BookingError::Validation("mentee_id is required".to_string())
        );
    }

    #[test]
    fn draft_validation_rejects_inverted_range() {
        let mut d = draft();
        d.end_time = Some("2025-03-03T09:00:00Z".to_string());
        assert!(matches!(d.validate(), Err(BookingError::InvalidRange { .. })));
    }

    #[test]
    fn status_round_trips_through_wire_names() {
        for status in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Completed,
            AppointmentStatus::Canceled,
            AppointmentStatus::NoShow,
        ] {
            assert_eq!(AppointmentStatus::parse(status.as_str()).unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!(AppointmentStatus::parse("archived").is_err());
    }

    #[test]
    fn hold_goes_stale_after_ttl() {
        let now = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
        let range = TimeRange::parse("2025-03-03T10:00:00Z", "2025-03-03T11:00:00Z").unwrap();
        let hold = Hold::active(None, "m".into(), "e".into(), range, now);
        let ttl = chrono::Duration::minutes(15);

        assert!(hold.is_active(now + chrono::Duration::minutes(14), ttl));
        assert!(hold.is_stale(now + chrono::Duration::minutes(15), ttl));
        assert!(!hold.is_active(now + chrono::Duration::minutes(15), ttl));
    }

    #[test]
    fn review_rules() {
        let now = Utc::now();
        assert!(Review::new("a".into(), "a".into(), "great", 5, now).is_err());
        assert!(Review::new("a".into(), "b".into(), "great", 0, now).is_err());
        assert!(Review::new("a".into(), "b".into(), "  ", 3, now).is_err());
        let review = Review::new("a".into(), "b".into(), " helpful session ", 4, now).unwrap();
        assert_eq!(review.content, "helpful session");
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from_cents(12_345).to_string(), "$123.45");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
    }
}
