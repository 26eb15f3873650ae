//! Row types and their conversion into domain values.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use mentorship_core::availability::AvailabilityWindow;
use mentorship_core::error::{BookingError, ConflictKind};
use mentorship_core::time_range::TimeRange;
use mentorship_core::types::{
    Appointment, AppointmentId, AppointmentStatus, Hold, HoldId, MentorProfile, Money, ProposalId,
    RescheduleProposal, Review, ReviewId, ServiceType, UserId, UserProfile,
};
use sqlx::types::Json;
use uuid::Uuid;

/// SQLSTATE for `exclusion_violation`.
const EXCLUSION_VIOLATION: &str = "23P01";

/// Wrap a driver error with context.
pub(crate) fn db(context: &'static str) -> impl FnOnce(sqlx::Error) -> BookingError {
    move |e| BookingError::downstream(context, e)
}

/// Like [`db`], but an exclusion-constraint violation means another booking
/// took the range.
pub(crate) fn db_write(context: &'static str) -> impl FnOnce(sqlx::Error) -> BookingError {
    move |e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some(EXCLUSION_VIOLATION) {
                tracing::warn!(context, "Overlap caught by exclusion constraint");
                metrics::counter!("booking_exclusion_violations_total").increment(1);
                return BookingError::Conflict(ConflictKind::SlotBooked);
            }
        }
        BookingError::downstream(context, e)
    }
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> BookingError {
    BookingError::Downstream(format!("corrupt {what} row: {detail}"))
}

fn range(what: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<TimeRange, BookingError> {
    TimeRange::new(start, end).map_err(|e| corrupt(what, e))
}

pub(crate) fn cents(money: Money) -> Result<i64, BookingError> {
    i64::try_from(money.cents()).map_err(|_| BookingError::Validation("price is too large".to_string()))
}

#[derive(sqlx::FromRow)]
pub(crate) struct AppointmentRow {
    id: Uuid,
    mentor_id: String,
    mentee_id: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    service_type: String,
    price: i64,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = BookingError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AppointmentId::from_uuid(row.id),
            mentor_id: UserId::from(row.mentor_id.as_str()),
            mentee_id: UserId::from(row.mentee_id.as_str()),
            time_range: range("appointment", row.start_time, row.end_time)?,
            status: AppointmentStatus::parse(&row.status).map_err(|e| corrupt("appointment", e))?,
            service_type: ServiceType::parse(&row.service_type)
                .map_err(|e| corrupt("appointment", e))?,
            price: u64::try_from(row.price)
                .map(Money::from_cents)
                .map_err(|e| corrupt("appointment", e))?,
            paid_at: row.paid_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) fn appointments(rows: Vec<AppointmentRow>) -> Result<Vec<Appointment>, BookingError> {
    rows.into_iter().map(Appointment::try_from).collect()
}

#[derive(sqlx::FromRow)]
pub(crate) struct HoldRow {
    id: Uuid,
    appointment_id: Option<Uuid>,
    mentor_id: String,
    mentee_id: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<HoldRow> for Hold {
    type Error = BookingError;

    fn try_from(row: HoldRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: HoldId::from_uuid(row.id),
            appointment_id: row.appointment_id.map(AppointmentId::from_uuid),
            mentor_id: UserId::from(row.mentor_id.as_str()),
            mentee_id: UserId::from(row.mentee_id.as_str()),
            time_range: range("hold", row.start_time, row.end_time)?,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ProposalRow {
    id: Uuid,
    appointment_id: Uuid,
    proposed_time_ranges: Json<Vec<TimeRange>>,
    receiver: String,
    proposer: String,
    proposed_at: DateTime<Utc>,
}

impl From<ProposalRow> for RescheduleProposal {
    fn from(row: ProposalRow) -> Self {
        Self {
            id: ProposalId::from_uuid(row.id),
            appointment_id: AppointmentId::from_uuid(row.appointment_id),
            proposed_time_ranges: row.proposed_time_ranges.0,
            receiver: UserId::from(row.receiver.as_str()),
            proposer: UserId::from(row.proposer.as_str()),
            proposed_at: row.proposed_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ReviewRow {
    id: Uuid,
    reviewee: String,
    reviewer: String,
    content: String,
    rating: i16,
    creation_time: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = BookingError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ReviewId::from_uuid(row.id),
            reviewee: UserId::from(row.reviewee.as_str()),
            reviewer: UserId::from(row.reviewer.as_str()),
            content: row.content,
            rating: u8::try_from(row.rating).map_err(|e| corrupt("review", e))?,
            creation_time: row.creation_time,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    user_id: String,
    email: String,
    display_name: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        Self {
            user_id: UserId::from(row.user_id.as_str()),
            email: row.email,
            display_name: row.display_name,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct MentorRow {
    user_id: String,
    headline: String,
    bio: String,
    hourly_rate: i64,
    services: Vec<String>,
}

impl TryFrom<MentorRow> for MentorProfile {
    type Error = BookingError;

    fn try_from(row: MentorRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::from(row.user_id.as_str()),
            headline: row.headline,
            bio: row.bio,
            hourly_rate: u64::try_from(row.hourly_rate)
                .map(Money::from_cents)
                .map_err(|e| corrupt("mentor", e))?,
            services: row
                .services
                .iter()
                .map(|s| ServiceType::parse(s))
                .collect::<Result<_, _>>()
                .map_err(|e| corrupt("mentor", e))?,
        })
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(sqlx::FromRow)]
pub(crate) struct WindowRow {
    weekday: i16,
    start_time: NaiveTime,
    end_time: NaiveTime,
}

impl TryFrom<WindowRow> for AvailabilityWindow {
    type Error = BookingError;

    fn try_from(row: WindowRow) -> Result<Self, Self::Error> {
        let weekday = usize::try_from(row.weekday)
            .ok()
            .and_then(|day| WEEK.get(day).copied())
            .ok_or_else(|| corrupt("availability", format!("weekday {}", row.weekday)))?;
        Self::new(weekday, row.start_time, row.end_time).map_err(|e| corrupt("availability", e))
    }
}

/// Monday-based day number stored in `availability_windows.weekday`.
pub(crate) fn weekday_number(day: Weekday) -> i16 {
    // num_days_from_monday is always 0..=6
    i16::try_from(day.num_days_from_monday()).unwrap_or_default()
}
