//! In-memory backend.
//!
//! Used when no `DATABASE_URL` is configured and throughout the test suites.
//! All booking tables sit behind one async `RwLock`; every check-then-write
//! runs under a single write guard, which is what makes reservations atomic.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mentorship_core::availability::AvailabilityWindow;
use mentorship_core::environment::Clock;
use mentorship_core::error::{BookingError, ConflictKind, Result};
use mentorship_core::lifecycle::{self, PaymentStep};
use mentorship_core::providers::{
    AppointmentStore, AvailabilityStore, HoldLedger, ProfileDirectory, ProposalStore, Reservation,
    ReviewStore, SweepOutcome,
};
use mentorship_core::time_range::TimeRange;
use mentorship_core::types::{
    Appointment, AppointmentId, AppointmentStatus, AppointmentUpdate, Hold, MentorProfile,
    NewAppointment, PaymentConfirmation, ProposalId, RescheduleProposal, Review, ReviewId, UserId,
    UserProfile,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// Appointments and holds
// ============================================================================

#[derive(Debug, Default)]
struct Tables {
    appointments: HashMap<AppointmentId, Appointment>,
    holds: Vec<Hold>,
}

impl Tables {
    fn appointment_mut(&mut self, id: AppointmentId) -> Result<&mut Appointment> {
        self.appointments
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("appointment", id))
    }

    /// Release stale holds (optionally for one mentor) and cancel the
    /// pending appointments they protected. Released holds are dropped.
    fn sweep_stale(&mut self, mentor: Option<&UserId>, now: DateTime<Utc>, ttl: Duration) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();
        let mut orphaned = Vec::new();

        for hold in &mut self.holds {
            if mentor.is_some_and(|m| m != &hold.mentor_id) || !hold.is_stale(now, ttl) {
                continue;
            }
            hold.expires_at = Some(now);
            outcome.released_holds += 1;
            if let Some(id) = hold.appointment_id {
                orphaned.push(id);
            }
        }
        self.holds.retain(|h| h.expires_at.is_none());

        for id in orphaned {
            if let Some(appointment) = self.appointments.get_mut(&id) {
                if appointment.status == AppointmentStatus::Pending {
                    appointment.status = AppointmentStatus::Canceled;
                    appointment.updated_at = now;
                    outcome.canceled.push(appointment.clone());
                }
            }
        }
        outcome
    }

    fn held(
        &self,
        mentor: &UserId,
        range: &TimeRange,
        exclude: Option<AppointmentId>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> bool {
        self.holds.iter().any(|h| {
            &h.mentor_id == mentor
                && h.is_active(now, ttl)
                && (exclude.is_none() || h.appointment_id != exclude)
                && h.time_range.overlaps(range)
        })
    }

    fn booked(&self, mentor: &UserId, range: &TimeRange, exclude: Option<AppointmentId>) -> bool {
        self.appointments.values().any(|a| {
            &a.mentor_id == mentor
                && a.status.blocks_slot()
                && Some(a.id) != exclude
                && a.time_range.overlaps(range)
        })
    }

    fn release_for(&mut self, appointment_id: AppointmentId, now: DateTime<Utc>) {
        for hold in &mut self.holds {
            if hold.appointment_id == Some(appointment_id) && hold.expires_at.is_none() {
                hold.expires_at = Some(now);
            }
        }
    }
}

/// In-memory appointment store and hold ledger.
pub struct InMemoryBookingStore {
    tables: RwLock<Tables>,
    clock: Arc<dyn Clock>,
    hold_ttl: Duration,
}

impl InMemoryBookingStore {
    /// Create an empty store. Holds older than `hold_ttl` count as expired.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, hold_ttl: Duration) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            clock,
            hold_ttl,
        }
    }
}

#[async_trait]
impl HoldLedger for InMemoryBookingStore {
    async fn acquire(&self, mentor_id: &UserId, mentee_id: &UserId, range: TimeRange) -> Result<Hold> {
        let now = self.clock.now();
        let mut tables = self.tables.write().await;
        tables.sweep_stale(Some(mentor_id), now, self.hold_ttl);

        if tables.held(mentor_id, &range, None, now, self.hold_ttl) {
            return Err(BookingError::Conflict(ConflictKind::SlotHeld));
        }

        let hold = Hold::active(None, mentor_id.clone(), mentee_id.clone(), range, now);
        tables.holds.push(hold.clone());
        Ok(hold)
    }

    async fn release(&self, mentor_id: &UserId, range: &TimeRange) -> Result<usize> {
        let now = self.clock.now();
        let mut tables = self.tables.write().await;
        let mut released = 0;
        for hold in &mut tables.holds {
            if &hold.mentor_id == mentor_id && &hold.time_range == range && hold.expires_at.is_none() {
                hold.expires_at = Some(now);
                released += 1;
            }
        }
        Ok(released)
    }

    async fn list_active(&self, mentor_id: &UserId) -> Result<Vec<Hold>> {
        let now = self.clock.now();
        let tables = self.tables.read().await;
        let mut holds: Vec<Hold> = tables
            .holds
            .iter()
            .filter(|h| &h.mentor_id == mentor_id && h.is_active(now, self.hold_ttl))
            .cloned()
            .collect();
        holds.sort_by_key(|h| h.time_range);
        Ok(holds)
    }
}

#[async_trait]
impl AppointmentStore for InMemoryBookingStore {
    async fn create(&self, input: NewAppointment) -> Result<Appointment> {
        let now = self.clock.now();
        let mut tables = self.tables.write().await;

        if tables.booked(&input.mentor_id, &input.time_range, None) {
            return Err(BookingError::Conflict(ConflictKind::SlotBooked));
        }

        let appointment = Appointment::pending(input, now);
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn reserve(&self, input: NewAppointment) -> Result<Reservation> {
        let now = self.clock.now();
        let mut tables = self.tables.write().await;

        let swept = tables.sweep_stale(Some(&input.mentor_id), now, self.hold_ttl);
        if !swept.canceled.is_empty() {
            tracing::info!(
                mentor_id = %input.mentor_id,
                canceled = swept.canceled.len(),
                "Canceled pending appointments with stale holds"
            );
        }

        if tables.held(&input.mentor_id, &input.time_range, None, now, self.hold_ttl) {
            return Err(BookingError::Conflict(ConflictKind::SlotHeld));
        }
        if tables.booked(&input.mentor_id, &input.time_range, None) {
            return Err(BookingError::Conflict(ConflictKind::SlotBooked));
        }

        let appointment = Appointment::pending(input, now);
        let hold = Hold::active(
            Some(appointment.id),
            appointment.mentor_id.clone(),
            appointment.mentee_id.clone(),
            appointment.time_range,
            now,
        );
        tables.appointments.insert(appointment.id, appointment.clone());
        tables.holds.push(hold.clone());

        Ok(Reservation { appointment, hold })
    }

    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn update(&self, id: AppointmentId, update: AppointmentUpdate) -> Result<Appointment> {
        let now = self.clock.now();
        let mut tables = self.tables.write().await;

        let current = tables.appointment_mut(id)?.clone();
        let plan = lifecycle::plan_update(current.status, &update)?;

        if let Some(range) = plan.time_range {
            if tables.held(&current.mentor_id, &range, Some(id), now, self.hold_ttl) {
                return Err(BookingError::Conflict(ConflictKind::SlotHeld));
            }
            if tables.booked(&current.mentor_id, &range, Some(id)) {
                return Err(BookingError::Conflict(ConflictKind::SlotBooked));
            }
        }
        if plan.cancels() {
            tables.release_for(id, now);
        }

        let appointment = tables.appointment_mut(id)?;
        if let Some(range) = plan.time_range {
            appointment.time_range = range;
        }
        if let Some(status) = plan.status {
            appointment.status = status;
        }
        appointment.updated_at = now;
        Ok(appointment.clone())
    }

    async fn confirm(&self, id: AppointmentId) -> Result<Appointment> {
        let now = self.clock.now();
        let mut tables = self.tables.write().await;

        let appointment = tables.appointment_mut(id)?;
        appointment.status = lifecycle::confirm(appointment.status)?;
        appointment.updated_at = now;
        let confirmed = appointment.clone();

        tables.release_for(id, now);
        Ok(confirmed)
    }

    async fn confirm_paid(&self, id: AppointmentId) -> Result<PaymentConfirmation> {
        let now = self.clock.now();
        let mut tables = self.tables.write().await;

        let appointment = tables.appointment_mut(id)?;
        let step = lifecycle::pay_confirmation(appointment.status, appointment.paid_at)?;
        if step == PaymentStep::AlreadyPaid {
            return Ok(PaymentConfirmation::AlreadyPaid(appointment.clone()));
        }

        if step == PaymentStep::ConfirmAndRecord {
            appointment.status = AppointmentStatus::Confirmed;
        }
        appointment.paid_at = Some(now);
        appointment.updated_at = now;
        let paid = appointment.clone();

        tables.release_for(id, now);
        Ok(PaymentConfirmation::Recorded(paid))
    }

    async fn cancel(&self, id: AppointmentId) -> Result<Appointment> {
        let now = self.clock.now();
        let mut tables = self.tables.write().await;

        let appointment = tables.appointment_mut(id)?;
        appointment.status = lifecycle::cancel(appointment.status)?;
        appointment.updated_at = now;
        let canceled = appointment.clone();

        tables.release_for(id, now);
        Ok(canceled)
    }

    async fn list_for_mentor(&self, mentor_id: &UserId, window: &TimeRange) -> Result<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| {
                &a.mentor_id == mentor_id && a.status.blocks_slot() && a.time_range.overlaps(window)
            })
            .cloned()
            .collect();
        found.sort_by_key(|a| a.time_range);
        Ok(found)
    }

    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.involves(user))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn expire_stale_holds(&self) -> Result<SweepOutcome> {
        let now = self.clock.now();
        let mut tables = self.tables.write().await;
        Ok(tables.sweep_stale(None, now, self.hold_ttl))
    }
}

// ============================================================================
// Profiles and availability
// ============================================================================

/// In-memory user, mentor and availability directory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<UserId, UserProfile>>,
    mentors: RwLock<HashMap<UserId, MentorProfile>>,
    schedules: RwLock<HashMap<UserId, Vec<AvailabilityWindow>>>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryDirectory {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn get_mentor(&self, user_id: &UserId) -> Result<Option<MentorProfile>> {
        Ok(self.mentors.read().await.get(user_id).cloned())
    }

    async fn upsert_user(&self, mut profile: UserProfile) -> Result<UserProfile> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.get(&profile.user_id) {
            profile.created_at = existing.created_at;
        }
        users.insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }

    async fn upsert_mentor(&self, profile: MentorProfile) -> Result<MentorProfile> {
        self.mentors
            .write()
            .await
            .insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryDirectory {
    async fn schedule(&self, mentor_id: &UserId) -> Result<Vec<AvailabilityWindow>> {
        Ok(self
            .schedules
            .read()
            .await
            .get(mentor_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_schedule(&self, mentor_id: &UserId, windows: Vec<AvailabilityWindow>) -> Result<()> {
        self.schedules.write().await.insert(mentor_id.clone(), windows);
        Ok(())
    }
}

// ============================================================================
// Proposals and reviews
// ============================================================================

/// In-memory reschedule proposals.
#[derive(Debug, Default)]
pub struct InMemoryProposalStore {
    proposals: RwLock<Vec<RescheduleProposal>>,
}

impl InMemoryProposalStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProposalStore for InMemoryProposalStore {
    async fn replace(&self, proposal: RescheduleProposal) -> Result<RescheduleProposal> {
        let mut proposals = self.proposals.write().await;
        proposals.retain(|p| p.appointment_id != proposal.appointment_id);
        proposals.push(proposal.clone());
        Ok(proposal)
    }

    async fn get(&self, id: ProposalId) -> Result<Option<RescheduleProposal>> {
        Ok(self.proposals.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn list_for_receiver(&self, receiver: &UserId) -> Result<Vec<RescheduleProposal>> {
        let mut found: Vec<RescheduleProposal> = self
            .proposals
            .read()
            .await
            .iter()
            .filter(|p| &p.receiver == receiver)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.proposed_at.cmp(&a.proposed_at));
        Ok(found)
    }

    async fn delete_for_appointment(&self, appointment_id: AppointmentId) -> Result<usize> {
        let mut proposals = self.proposals.write().await;
        let before = proposals.len();
        proposals.retain(|p| p.appointment_id != appointment_id);
        Ok(before - proposals.len())
    }
}

/// In-memory reviews.
#[derive(Debug, Default)]
pub struct InMemoryReviewStore {
    reviews: RwLock<HashMap<ReviewId, Review>>,
}

impl InMemoryReviewStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn insert(&self, review: Review) -> Result<Review> {
        self.reviews.write().await.insert(review.id, review.clone());
        Ok(review)
    }

    async fn get(&self, id: ReviewId) -> Result<Option<Review>> {
        Ok(self.reviews.read().await.get(&id).cloned())
    }

    async fn delete(&self, id: ReviewId) -> Result<bool> {
        Ok(self.reviews.write().await.remove(&id).is_some())
    }

    async fn list_for_reviewee(&self, reviewee: &UserId) -> Result<Vec<Review>> {
        let mut found: Vec<Review> = self
            .reviews
            .read()
            .await
            .values()
            .filter(|r| &r.reviewee == reviewee)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.creation_time.cmp(&a.creation_time));
        Ok(found)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mentorship_testing::fixtures::{self, MENTEE, MENTOR, OTHER_MENTEE, range};
    use mentorship_testing::ManualClock;

    fn store() -> (InMemoryBookingStore, ManualClock) {
        let clock = ManualClock::at(fixtures::monday(8, 0));
        (InMemoryBookingStore::new(clock.shared(), Duration::minutes(15)), clock)
    }

    #[tokio::test]
    async fn overlapping_reservation_reports_hold() {
        let (store, _) = store();
        store
            .reserve(fixtures::new_appointment(MENTEE, range((10, 0), (11, 0))))
            .await
            .unwrap();

        let err = store
            .reserve(fixtures::new_appointment(OTHER_MENTEE, range((10, 30), (11, 30))))
            .await
            .unwrap_err();
        assert_eq!(err, BookingError::Conflict(ConflictKind::SlotHeld));
    }

    #[tokio::test]
    async fn confirmed_appointment_reports_booked() {
        let (store, _) = store();
        let first = store
            .reserve(fixtures::new_appointment(MENTEE, range((10, 0), (11, 0))))
            .await
            .unwrap();
        store.confirm(first.appointment.id).await.unwrap();

        let err = store
            .reserve(fixtures::new_appointment(OTHER_MENTEE, range((10, 30), (11, 30))))
            .await
            .unwrap_err();
        assert_eq!(err, BookingError::Conflict(ConflictKind::SlotBooked));
    }

    #[tokio::test]
    async fn adjacent_reservations_both_succeed() {
        let (store, _) = store();
        store
            .reserve(fixtures::new_appointment(MENTEE, range((10, 0), (11, 0))))
            .await
            .unwrap();
        store
            .reserve(fixtures::new_appointment(OTHER_MENTEE, range((11, 0), (12, 0))))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_checks_appointments() {
        let (store, _) = store();
        store
            .create(fixtures::new_appointment(MENTEE, range((10, 0), (11, 0))))
            .await
            .unwrap();
        let err = store
            .create(fixtures::new_appointment(OTHER_MENTEE, range((10, 59), (11, 30))))
            .await
            .unwrap_err();
        assert_eq!(err.conflict_kind(), Some(ConflictKind::SlotBooked));
    }

    #[tokio::test]
    async fn cancel_releases_hold_for_new_acquire() {
        let (store, _) = store();
        let slot = range((10, 0), (11, 0));
        let reserved = store
            .reserve(fixtures::new_appointment(MENTEE, slot))
            .await
            .unwrap();
        store.confirm(reserved.appointment.id).await.unwrap();
        store.cancel(reserved.appointment.id).await.unwrap();

        let mentor = UserId::from(MENTOR);
        assert!(store.list_active(&mentor).await.unwrap().is_empty());
        store
            .acquire(&mentor, &UserId::from(OTHER_MENTEE), slot)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let (store, _) = store();
        let mentor = UserId::from(MENTOR);
        let slot = range((9, 0), (9, 30));
        store.acquire(&mentor, &UserId::from(MENTEE), slot).await.unwrap();

        assert_eq!(store.release(&mentor, &slot).await.unwrap(), 1);
        assert_eq!(store.release(&mentor, &slot).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stale_hold_frees_slot_and_cancels_pending() {
        let (store, clock) = store();
        let stale = store
            .reserve(fixtures::new_appointment(MENTEE, range((10, 0), (11, 0))))
            .await
            .unwrap();

        clock.advance(Duration::minutes(15));
        store
            .reserve(fixtures::new_appointment(OTHER_MENTEE, range((10, 0), (11, 0))))
            .await
            .unwrap();

        let old = store.get(stale.appointment.id).await.unwrap().unwrap();
        assert_eq!(old.status, AppointmentStatus::Canceled);
    }

    #[tokio::test]
    async fn sweep_reports_released_holds() {
        let (store, clock) = store();
        store
            .reserve(fixtures::new_appointment(MENTEE, range((10, 0), (11, 0))))
            .await
            .unwrap();
        clock.advance(Duration::minutes(20));

        let outcome = store.expire_stale_holds().await.unwrap();
        assert_eq!(outcome.released_holds, 1);
        assert_eq!(outcome.canceled.len(), 1);
        assert_eq!(store.expire_stale_holds().await.unwrap(), SweepOutcome::default());
    }

    #[tokio::test]
    async fn released_holds_do_not_accumulate() {
        let (store, clock) = store();
        let mentor = UserId::from(MENTOR);
        let mentee = UserId::from(MENTEE);
        for hour in 9..12 {
            let slot = range((hour, 0), (hour, 30));
            store.acquire(&mentor, &mentee, slot).await.unwrap();
            store.release(&mentor, &slot).await.unwrap();
        }
        store.acquire(&mentor, &mentee, range((13, 0), (13, 30))).await.unwrap();
        assert_eq!(store.tables.read().await.holds.len(), 1);

        clock.advance(Duration::minutes(20));
        store.expire_stale_holds().await.unwrap();
        assert!(store.tables.read().await.holds.is_empty());
    }

    #[tokio::test]
    async fn generic_update_on_pending_is_rejected() {
        let (store, _) = store();
        let reserved = store
            .reserve(fixtures::new_appointment(MENTEE, range((10, 0), (11, 0))))
            .await
            .unwrap();
        let id = reserved.appointment.id;

        let err = store
            .update(
                id,
                AppointmentUpdate {
                    status: Some(AppointmentStatus::Confirmed),
                    time_range: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_transition_error());

        assert_eq!(store.confirm(id).await.unwrap().status, AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn reschedule_excludes_itself_but_not_others() {
        let (store, _) = store();
        let a = store
            .reserve(fixtures::new_appointment(MENTEE, range((10, 0), (11, 0))))
            .await
            .unwrap();
        let b = store
            .reserve(fixtures::new_appointment(OTHER_MENTEE, range((12, 0), (13, 0))))
            .await
            .unwrap();
        store.confirm(a.appointment.id).await.unwrap();
        store.confirm(b.appointment.id).await.unwrap();

        let shifted = store
            .update(
                a.appointment.id,
                AppointmentUpdate {
                    status: None,
                    time_range: Some(range((10, 30), (11, 30))),
                },
            )
            .await
            .unwrap();
        assert_eq!(shifted.time_range, range((10, 30), (11, 30)));

        let err = store
            .update(
                a.appointment.id,
                AppointmentUpdate {
                    status: None,
                    time_range: Some(range((12, 30), (13, 30))),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, BookingError::Conflict(ConflictKind::SlotBooked));
    }

    #[tokio::test]
    async fn confirm_paid_is_idempotent() {
        let (store, _) = store();
        let reserved = store
            .reserve(fixtures::new_appointment(MENTEE, range((10, 0), (11, 0))))
            .await
            .unwrap();
        let id = reserved.appointment.id;

        let first = store.confirm_paid(id).await.unwrap();
        assert!(matches!(first, PaymentConfirmation::Recorded(_)));
        assert_eq!(first.appointment().status, AppointmentStatus::Confirmed);
        assert!(first.appointment().paid_at.is_some());

        let second = store.confirm_paid(id).await.unwrap();
        assert!(matches!(second, PaymentConfirmation::AlreadyPaid(_)));
    }

    #[tokio::test]
    async fn missing_appointment_is_not_found() {
        let (store, _) = store();
        let err = store.cancel(AppointmentId::new()).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound { entity: "appointment", .. }));
    }

    #[tokio::test]
    async fn upsert_user_keeps_created_at() {
        let directory = InMemoryDirectory::new();
        let original = fixtures::user_profile(MENTEE);
        directory.upsert_user(original.clone()).await.unwrap();

        let mut renamed = original.clone();
        renamed.display_name = "Renamed".to_string();
        renamed.created_at = fixtures::monday(12, 0);
        let stored = directory.upsert_user(renamed).await.unwrap();

        assert_eq!(stored.created_at, original.created_at);
        assert_eq!(stored.display_name, "Renamed");
    }

    #[tokio::test]
    async fn new_proposal_replaces_previous() {
        let proposals = InMemoryProposalStore::new();
        let appointment_id = AppointmentId::new();
        let proposal = |hour| RescheduleProposal {
            id: ProposalId::new(),
            appointment_id,
            proposed_time_ranges: vec![range((hour, 0), (hour + 1, 0))],
            receiver: UserId::from(MENTOR),
            proposer: UserId::from(MENTEE),
            proposed_at: fixtures::monday(8, 0),
        };

        proposals.replace(proposal(10)).await.unwrap();
        let latest = proposals.replace(proposal(14)).await.unwrap();

        let listed = proposals.list_for_receiver(&UserId::from(MENTOR)).await.unwrap();
        assert_eq!(listed, vec![latest]);
        assert_eq!(proposals.delete_for_appointment(appointment_id).await.unwrap(), 1);
    }
}
