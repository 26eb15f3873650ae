//! Fixture builders.
//!
//! Times are on Monday 2025-03-03 UTC unless stated otherwise. Users get the
//! address `<id>@example.com`.

#![allow(clippy::unwrap_used)] // Fixed calendar values always construct
#![allow(clippy::missing_panics_doc)]

use chrono::{DateTime, TimeZone, Utc};
use mentorship_core::providers::ProfileDirectory;
use mentorship_core::types::{
    AppointmentDraft, MentorProfile, Money, NewAppointment, ServiceType, UserId, UserProfile,
};
use mentorship_core::TimeRange;

/// Default mentor id used across tests.
pub const MENTOR: &str = "user_mentor";
/// Default mentee id used across tests.
pub const MENTEE: &str = "user_mentee";
/// A second mentee for contention tests.
pub const OTHER_MENTEE: &str = "user_other";

/// A time on the fixture Monday.
#[must_use]
pub fn monday(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, hour, minute, 0).unwrap()
}

/// `[from, to)` on the fixture Monday.
#[must_use]
pub fn range(from: (u32, u32), to: (u32, u32)) -> TimeRange {
    TimeRange::new(monday(from.0, from.1), monday(to.0, to.1)).unwrap()
}

/// Email address assigned to a fixture user.
#[must_use]
pub fn email_of(user_id: &str) -> String {
    format!("{user_id}@example.com")
}

/// A plain user profile.
#[must_use]
pub fn user_profile(user_id: &str) -> UserProfile {
    UserProfile {
        user_id: UserId::from(user_id),
        email: email_of(user_id),
        display_name: user_id.trim_start_matches("user_").to_string(),
        created_at: monday(0, 0),
    }
}

/// A mentor profile offering coffee chats and mock interviews.
#[must_use]
pub fn mentor_profile(user_id: &str) -> MentorProfile {
    MentorProfile {
        user_id: UserId::from(user_id),
        headline: "Staff engineer".to_string(),
        bio: "Happy to talk careers and systems design.".to_string(),
        hourly_rate: Money::from_cents(12_000),
        services: vec![
            ServiceType::parse("coffee_chat").unwrap(),
            ServiceType::parse("mock_interview").unwrap(),
        ],
    }
}

/// Store [`MENTOR`] (with mentor profile), [`MENTEE`] and [`OTHER_MENTEE`].
///
/// # Errors
///
/// Propagates store failures.
pub async fn seed_default_users(directory: &dyn ProfileDirectory) -> mentorship_core::Result<()> {
    for id in [MENTOR, MENTEE, OTHER_MENTEE] {
        directory.upsert_user(user_profile(id)).await?;
    }
    directory.upsert_mentor(mentor_profile(MENTOR)).await?;
    Ok(())
}

/// A raw booking request between the default users.
#[must_use]
pub fn draft(window: TimeRange, service_type: &str, price_cents: u64) -> AppointmentDraft {
    AppointmentDraft {
        mentor_id: Some(MENTOR.to_string()),
        mentee_id: Some(MENTEE.to_string()),
        start_time: Some(window.start().to_rfc3339()),
        end_time: Some(window.end().to_rfc3339()),
        service_type: Some(service_type.to_string()),
        price: Some(price_cents),
    }
}

/// A free coffee chat request between the default users.
#[must_use]
pub fn coffee_chat(window: TimeRange) -> AppointmentDraft {
    draft(window, "coffee_chat", 0)
}

/// A paid mock interview request between the default users.
#[must_use]
pub fn mock_interview(window: TimeRange) -> AppointmentDraft {
    draft(window, "mock_interview", 12_000)
}

/// Validated input for direct store calls.
#[must_use]
pub fn new_appointment(mentee: &str, window: TimeRange) -> NewAppointment {
    NewAppointment {
        mentor_id: UserId::from(MENTOR),
        mentee_id: UserId::from(mentee),
        time_range: window,
        service_type: ServiceType::parse("mock_interview").unwrap(),
        price: Money::from_cents(12_000),
    }
}
