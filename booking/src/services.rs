//! Profile, availability and review services.
//!
//! Thin rules around the stores: identity checks against the acting user and
//! input validation. Scheduling itself lives in the orchestrator.

use mentorship_core::availability::{self, AvailabilityWindow, FreeBusy};
use mentorship_core::environment::Clock;
use mentorship_core::error::{BookingError, Result};
use mentorship_core::providers::{
    AppointmentStore, AvailabilityStore, HoldLedger, ProfileDirectory, ReviewStore,
};
use mentorship_core::time_range::TimeRange;
use mentorship_core::types::{MentorProfile, Money, Review, ReviewId, ServiceType, UserId, UserProfile};
use std::sync::Arc;
use tracing::info;

fn ensure_self(user: &UserId, actor: &UserId, what: &str) -> Result<()> {
    if user == actor {
        Ok(())
    } else {
        Err(BookingError::Unauthorized(format!("you can only {what}")))
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// Profile changes requested by a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileInput {
    /// Contact address
    pub email: String,
    /// Name shown to others
    pub display_name: String,
}

/// Mentor profile changes requested by a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MentorInput {
    /// One-line pitch
    pub headline: String,
    /// Longer description
    pub bio: String,
    /// Rate in cents per hour
    pub hourly_rate: u64,
    /// Offered service type names
    pub services: Vec<String>,
}

/// User and mentor profiles.
pub struct ProfileService {
    directory: Arc<dyn ProfileDirectory>,
    clock: Arc<dyn Clock>,
}

impl ProfileService {
    /// Creates a new profile service
    #[must_use]
    pub fn new(directory: Arc<dyn ProfileDirectory>, clock: Arc<dyn Clock>) -> Self {
        Self { directory, clock }
    }

    /// Public view of a user: the profile and, for mentors, the mentor profile.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown users.
    pub async fn get(&self, user_id: &UserId) -> Result<(UserProfile, Option<MentorProfile>)> {
        let (user, mentor) = tokio::join!(
            self.directory.get_user(user_id),
            self.directory.get_mentor(user_id)
        );
        let user = user?.ok_or_else(|| BookingError::not_found("user", user_id))?;
        Ok((user, mentor?))
    }

    /// Create or update the acting user's profile.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed email or blank name.
    pub async fn upsert(&self, actor: &UserId, input: ProfileInput) -> Result<UserProfile> {
        let email = input.email.trim();
        let valid_email = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid_email {
            return Err(BookingError::Validation(format!("{email:?} is not a valid email")));
        }
        let display_name = input.display_name.trim();
        if display_name.is_empty() {
            return Err(BookingError::Validation("display_name is required".to_string()));
        }

        let profile = self
            .directory
            .upsert_user(UserProfile {
                user_id: actor.clone(),
                email: email.to_string(),
                display_name: display_name.to_string(),
                created_at: self.clock.now(),
            })
            .await?;
        info!(user_id = %actor, "Profile saved");
        Ok(profile)
    }

    /// Create or update the acting user's mentor profile, making them a mentor.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user has no profile yet; `Validation` for a blank
    /// headline or an empty service list.
    pub async fn upsert_mentor(&self, actor: &UserId, input: MentorInput) -> Result<MentorProfile> {
        if self.directory.get_user(actor).await?.is_none() {
            return Err(BookingError::not_found("user", actor));
        }
        let headline = input.headline.trim();
        if headline.is_empty() {
            return Err(BookingError::Validation("headline is required".to_string()));
        }
        let mut services = input
            .services
            .iter()
            .map(|s| ServiceType::parse(s))
            .collect::<Result<Vec<_>>>()?;
        services.dedup();
        if services.is_empty() {
            return Err(BookingError::Validation(
                "at least one service is required".to_string(),
            ));
        }

        let profile = self
            .directory
            .upsert_mentor(MentorProfile {
                user_id: actor.clone(),
                headline: headline.to_string(),
                bio: input.bio.trim().to_string(),
                hourly_rate: Money::from_cents(input.hourly_rate),
                services,
            })
            .await?;
        info!(user_id = %actor, "Mentor profile saved");
        Ok(profile)
    }
}

// ============================================================================
// Availability
// ============================================================================

/// Weekly schedules and free/busy queries.
pub struct AvailabilityService {
    schedules: Arc<dyn AvailabilityStore>,
    directory: Arc<dyn ProfileDirectory>,
    appointments: Arc<dyn AppointmentStore>,
    holds: Arc<dyn HoldLedger>,
}

impl AvailabilityService {
    /// Creates a new availability service
    #[must_use]
    pub fn new(
        schedules: Arc<dyn AvailabilityStore>,
        directory: Arc<dyn ProfileDirectory>,
        appointments: Arc<dyn AppointmentStore>,
        holds: Arc<dyn HoldLedger>,
    ) -> Self {
        Self {
            schedules,
            directory,
            appointments,
            holds,
        }
    }

    /// Free and busy intervals of `mentor_id` within `range`.
    ///
    /// Busy covers non-canceled appointments and active holds.
    ///
    /// # Errors
    ///
    /// `NotFound` for non-mentors, `Validation` for oversized ranges.
    pub async fn free_busy(&self, mentor_id: &UserId, range: &TimeRange) -> Result<FreeBusy> {
        self.require_mentor(mentor_id).await?;

        let (schedule, booked, held) = tokio::join!(
            self.schedules.schedule(mentor_id),
            self.appointments.list_for_mentor(mentor_id, range),
            self.holds.list_active(mentor_id),
        );
        let busy: Vec<TimeRange> = booked?
            .iter()
            .filter(|a| a.status.blocks_slot())
            .map(|a| a.time_range)
            .chain(held?.iter().map(|h| h.time_range))
            .collect();

        availability::free_busy(&schedule?, range, &busy)
    }

    /// Weekly schedule of a mentor.
    ///
    /// # Errors
    ///
    /// `NotFound` for non-mentors.
    pub async fn schedule(&self, mentor_id: &UserId) -> Result<Vec<AvailabilityWindow>> {
        self.require_mentor(mentor_id).await?;
        self.schedules.schedule(mentor_id).await
    }

    /// Replace the acting mentor's weekly schedule.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotFound` for non-mentors, `Validation` for
    /// overlapping or inverted windows.
    pub async fn replace_schedule(
        &self,
        mentor_id: &UserId,
        windows: Vec<AvailabilityWindow>,
        actor: &UserId,
    ) -> Result<Vec<AvailabilityWindow>> {
        ensure_self(mentor_id, actor, "edit your own availability")?;
        self.require_mentor(mentor_id).await?;
        availability::validate_schedule(&windows)?;

        self.schedules
            .replace_schedule(mentor_id, windows.clone())
            .await?;
        info!(mentor_id = %mentor_id, windows = windows.len(), "Availability updated");
        Ok(windows)
    }

    async fn require_mentor(&self, mentor_id: &UserId) -> Result<()> {
        self.directory
            .get_mentor(mentor_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| BookingError::not_found("mentor", mentor_id))
    }
}

// ============================================================================
// Reviews
// ============================================================================

/// Reviews between users.
pub struct ReviewService {
    reviews: Arc<dyn ReviewStore>,
    directory: Arc<dyn ProfileDirectory>,
    clock: Arc<dyn Clock>,
}

impl ReviewService {
    /// Creates a new review service
    #[must_use]
    pub fn new(
        reviews: Arc<dyn ReviewStore>,
        directory: Arc<dyn ProfileDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reviews,
            directory,
            clock,
        }
    }

    /// Leave a review as `actor`.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `actor` is the reviewer, `NotFound` for an
    /// unknown reviewee, `Validation` for bad content or rating.
    pub async fn submit(
        &self,
        reviewee: UserId,
        reviewer: UserId,
        content: &str,
        rating: u8,
        actor: &UserId,
    ) -> Result<Review> {
        ensure_self(&reviewer, actor, "submit reviews as yourself")?;
        if self.directory.get_user(&reviewee).await?.is_none() {
            return Err(BookingError::not_found("user", &reviewee));
        }
        let review = Review::new(reviewee, reviewer, content, rating, self.clock.now())?;
        let review = self.reviews.insert(review).await?;
        info!(review_id = %review.id, reviewee = %review.reviewee, rating, "Review submitted");
        Ok(review)
    }

    /// Delete a review. Missing reviews count as already deleted.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if the review exists and `actor` did not write it.
    pub async fn delete(&self, id: ReviewId, actor: &UserId) -> Result<()> {
        let Some(review) = self.reviews.get(id).await? else {
            return Ok(());
        };
        ensure_self(&review.reviewer, actor, "delete your own reviews")?;
        if self.reviews.delete(id).await? {
            info!(review_id = %id, "Review deleted");
        }
        Ok(())
    }

    /// Reviews about `reviewee`, newest first.
    ///
    /// # Errors
    ///
    /// `Downstream` on store failure.
    pub async fn list(&self, reviewee: &UserId) -> Result<Vec<Review>> {
        self.reviews.list_for_reviewee(reviewee).await
    }
}
