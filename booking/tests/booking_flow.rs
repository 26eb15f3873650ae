//! End-to-end booking workflow against the in-memory backend.

#![allow(clippy::unwrap_used)]

mod common;

use common::Harness;
use mentorship_booking::ProposalDraft;
use mentorship_core::providers::HoldLedger;
use mentorship_core::types::{
    AppointmentStatus, AppointmentUpdate, PaymentConfirmation, UserId,
};
use mentorship_core::{BookingError, ConflictKind};
use mentorship_testing::fixtures::{self, MENTEE, MENTOR, OTHER_MENTEE, email_of, range};

fn mentee() -> UserId {
    MENTEE.into()
}

fn mentor() -> UserId {
    MENTOR.into()
}

#[tokio::test]
async fn free_coffee_chat_confirms_without_payment_call() {
    let (h, mailer) = Harness::with_recording_mailer().await;

    let booked = h
        .orchestrator
        .book(fixtures::coffee_chat(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();

    assert_eq!(booked.status, AppointmentStatus::Confirmed);
    assert!(booked.paid_at.is_some());
    assert_eq!(h.payments.call_count(), 0);
    assert!(h.store.list_active(&mentor()).await.unwrap().is_empty());

    h.notifier.flush().await;
    assert_eq!(mailer.sent_to(&email_of(MENTOR)).len(), 1);
    assert_eq!(mailer.sent_to(&email_of(MENTEE)).len(), 1);
}

#[tokio::test]
async fn free_service_with_price_is_rejected() {
    let (h, _) = Harness::with_recording_mailer().await;
    let err = h
        .orchestrator
        .book(
            fixtures::draft(range((10, 0), (11, 0)), "coffee_chat", 500),
            &mentee(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn overlapping_booking_is_rejected() {
    let (h, _) = Harness::with_recording_mailer().await;
    h.orchestrator
        .book(fixtures::mock_interview(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();

    let mut draft = fixtures::mock_interview(range((10, 30), (11, 30)));
    draft.mentee_id = Some(OTHER_MENTEE.to_string());
    let err = h
        .orchestrator
        .book(draft, &OTHER_MENTEE.into())
        .await
        .unwrap_err();
    assert_eq!(err, BookingError::Conflict(ConflictKind::SlotHeld));
    assert!(err.to_string().contains("temporarily reserved"));
}

#[tokio::test]
async fn confirmed_slot_reports_already_booked() {
    let (h, _) = Harness::with_recording_mailer().await;
    h.orchestrator
        .book(fixtures::coffee_chat(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();

    let mut draft = fixtures::coffee_chat(range((10, 30), (11, 30)));
    draft.mentee_id = Some(OTHER_MENTEE.to_string());
    let err = h
        .orchestrator
        .book(draft, &OTHER_MENTEE.into())
        .await
        .unwrap_err();
    assert_eq!(err, BookingError::Conflict(ConflictKind::SlotBooked));
    assert!(err.to_string().contains("already booked"));
}

#[tokio::test]
async fn adjacent_slots_both_succeed() {
    let (h, _) = Harness::with_recording_mailer().await;
    h.orchestrator
        .book(fixtures::mock_interview(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();
    h.orchestrator
        .book(fixtures::mock_interview(range((11, 0), (12, 0))), &mentee())
        .await
        .unwrap();
}

#[tokio::test]
async fn booking_validates_parties() {
    let (h, _) = Harness::with_recording_mailer().await;
    let window = range((10, 0), (11, 0));

    let err = h
        .orchestrator
        .book(fixtures::mock_interview(window), &OTHER_MENTEE.into())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Unauthorized(_)));

    let mut draft = fixtures::mock_interview(window);
    draft.mentor_id = Some(OTHER_MENTEE.to_string());
    let err = h.orchestrator.book(draft, &mentee()).await.unwrap_err();
    assert!(matches!(err, BookingError::NotFound { entity: "mentor", .. }));

    let mut draft = fixtures::mock_interview(window);
    draft.mentee_id = Some(MENTOR.to_string());
    let err = h.orchestrator.book(draft, &mentor()).await.unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    let mut draft = fixtures::mock_interview(window);
    draft.end_time = draft.start_time.clone();
    let err = h.orchestrator.book(draft, &mentee()).await.unwrap_err();
    assert_eq!(err.to_string(), "invalid time range");
}

#[tokio::test]
async fn past_slots_cannot_be_booked() {
    let (h, _) = Harness::with_recording_mailer().await;
    h.clock.set(fixtures::monday(12, 0));
    let err = h
        .orchestrator
        .book(fixtures::mock_interview(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn cancel_releases_the_slot() {
    let (h, _) = Harness::with_recording_mailer().await;
    let window = range((10, 0), (11, 0));
    let booked = h
        .orchestrator
        .book(fixtures::mock_interview(window), &mentee())
        .await
        .unwrap();
    h.orchestrator.confirm(booked.id, &mentor()).await.unwrap();
    h.orchestrator.cancel(booked.id, &mentee()).await.unwrap();

    h.store
        .acquire(&mentor(), &OTHER_MENTEE.into(), window)
        .await
        .unwrap();
}

#[tokio::test]
async fn pending_appointments_reject_generic_updates() {
    let (h, _) = Harness::with_recording_mailer().await;
    let booked = h
        .orchestrator
        .book(fixtures::mock_interview(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();

    let err = h
        .orchestrator
        .update(
            booked.id,
            AppointmentUpdate {
                status: Some(AppointmentStatus::Confirmed),
                time_range: None,
            },
            &mentor(),
        )
        .await
        .unwrap_err();
    assert!(err.is_transition_error());

    let confirmed = h.orchestrator.confirm(booked.id, &mentor()).await.unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn only_the_mentor_confirms_and_records_attendance() {
    let (h, _) = Harness::with_recording_mailer().await;
    let booked = h
        .orchestrator
        .book(fixtures::mock_interview(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();

    let err = h.orchestrator.confirm(booked.id, &mentee()).await.unwrap_err();
    assert!(matches!(err, BookingError::Unauthorized(_)));

    h.orchestrator.confirm(booked.id, &mentor()).await.unwrap();
    let err = h.orchestrator.complete(booked.id, &mentee()).await.unwrap_err();
    assert!(matches!(err, BookingError::Unauthorized(_)));

    let done = h.orchestrator.complete(booked.id, &mentor()).await.unwrap();
    assert_eq!(done.status, AppointmentStatus::Completed);

    let err = h.orchestrator.mark_no_show(booked.id, &mentor()).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidTransition { .. }));
}

#[tokio::test]
async fn strangers_cannot_see_or_cancel() {
    let (h, _) = Harness::with_recording_mailer().await;
    let booked = h
        .orchestrator
        .book(fixtures::mock_interview(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();

    let stranger: UserId = OTHER_MENTEE.into();
    assert!(matches!(
        h.orchestrator.get(booked.id, &stranger).await,
        Err(BookingError::Unauthorized(_))
    ));
    assert!(matches!(
        h.orchestrator.cancel(booked.id, &stranger).await,
        Err(BookingError::Unauthorized(_))
    ));
    assert!(matches!(
        h.orchestrator.list_for_user(&mentee(), &stranger).await,
        Err(BookingError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn payment_confirmation_is_idempotent() {
    let (h, mailer) = Harness::with_recording_mailer().await;
    let booked = h
        .orchestrator
        .book(fixtures::mock_interview(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();

    let first = h.orchestrator.confirm_paid(booked.id).await.unwrap();
    assert!(matches!(first, PaymentConfirmation::Recorded(_)));
    assert_eq!(first.appointment().status, AppointmentStatus::Confirmed);
    h.notifier.flush().await;
    let sent = mailer.sent().len();

    let second = h.orchestrator.confirm_paid(booked.id).await.unwrap();
    assert!(matches!(second, PaymentConfirmation::AlreadyPaid(_)));
    h.notifier.flush().await;
    assert_eq!(mailer.sent().len(), sent);
}

#[tokio::test]
async fn payment_after_expiry_fails() {
    let (h, mailer) = Harness::with_recording_mailer().await;
    let booked = h
        .orchestrator
        .book(fixtures::mock_interview(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();

    h.clock.advance(chrono::Duration::minutes(20));
    let outcome = h.orchestrator.expire_stale_holds().await.unwrap();
    assert_eq!(outcome.canceled.len(), 1);

    h.notifier.flush().await;
    let before_payment = mailer.sent().len();

    let err = h.orchestrator.confirm_paid(booked.id).await.unwrap_err();
    assert_eq!(
        err,
        BookingError::ConfirmationFailed {
            status: AppointmentStatus::Canceled
        }
    );

    let after = h.orchestrator.get(booked.id, &mentee()).await.unwrap();
    assert_eq!(after.status, AppointmentStatus::Canceled);
    assert!(after.paid_at.is_none());
    h.notifier.flush().await;
    assert_eq!(mailer.sent().len(), before_payment);
}

#[tokio::test]
async fn stale_hold_frees_the_slot_for_the_next_booking() {
    let (h, _) = Harness::with_recording_mailer().await;
    let window = range((10, 0), (11, 0));
    let abandoned = h
        .orchestrator
        .book(fixtures::mock_interview(window), &mentee())
        .await
        .unwrap();

    h.clock.advance(chrono::Duration::minutes(16));
    let mut draft = fixtures::mock_interview(window);
    draft.mentee_id = Some(OTHER_MENTEE.to_string());
    h.orchestrator
        .book(draft, &OTHER_MENTEE.into())
        .await
        .unwrap();

    let abandoned = h.orchestrator.get(abandoned.id, &mentee()).await.unwrap();
    assert_eq!(abandoned.status, AppointmentStatus::Canceled);
}

#[tokio::test]
async fn checkout_goes_through_the_gateway() {
    let (h, _) = Harness::with_recording_mailer().await;
    let booked = h
        .orchestrator
        .book(fixtures::mock_interview(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();

    let session = h.orchestrator.begin_checkout(booked.id, &mentee()).await.unwrap();
    assert_eq!(session.session_id, format!("cs_test_{}", booked.id));

    let request = &h.payments.requests()[0];
    assert_eq!(request.amount.cents(), 12_000);
    assert_eq!(request.customer_email.as_deref(), Some(email_of(MENTEE).as_str()));
    assert_eq!(
        request.expires_at,
        Some(booked.created_at + chrono::Duration::minutes(15))
    );

    h.payments.go_down();
    let err = h.orchestrator.begin_checkout(booked.id, &mentee()).await.unwrap_err();
    assert!(matches!(err, BookingError::Downstream(_)));
}

#[tokio::test]
async fn checkout_is_refused_once_the_hold_has_lapsed() {
    let (h, _) = Harness::with_recording_mailer().await;
    let booked = h
        .orchestrator
        .book(fixtures::mock_interview(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();

    h.clock.advance(chrono::Duration::minutes(15));
    let err = h.orchestrator.begin_checkout(booked.id, &mentee()).await.unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
    assert_eq!(h.payments.call_count(), 0);
}

#[tokio::test]
async fn free_sessions_have_no_checkout() {
    let (h, _) = Harness::with_recording_mailer().await;
    let booked = h
        .orchestrator
        .book(fixtures::coffee_chat(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();
    let err = h.orchestrator.begin_checkout(booked.id, &mentee()).await.unwrap_err();
    assert!(matches!(err, BookingError::ConfirmationFailed { .. }));
}

fn proposal(appointment_id: mentorship_core::types::AppointmentId, ranges: &[(&str, &str)]) -> ProposalDraft {
    ProposalDraft {
        appointment_id,
        proposed_time_ranges: ranges
            .iter()
            .map(|(s, e)| ((*s).to_string(), (*e).to_string()))
            .collect(),
        receiver: mentee(),
        proposer: mentor(),
    }
}

#[tokio::test]
async fn reschedule_moves_appointment_only_on_accept() {
    let (h, mailer) = Harness::with_recording_mailer().await;
    let booked = h
        .orchestrator
        .book(fixtures::coffee_chat(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();

    let proposed = h
        .orchestrator
        .propose_reschedule(
            proposal(
                booked.id,
                &[
                    ("2025-03-03T14:00:00Z", "2025-03-03T15:00:00Z"),
                    ("2025-03-03T16:00:00Z", "2025-03-03T17:00:00Z"),
                ],
            ),
            &mentor(),
        )
        .await
        .unwrap();

    let unchanged = h.orchestrator.get(booked.id, &mentee()).await.unwrap();
    assert_eq!(unchanged.time_range, range((10, 0), (11, 0)));
    assert_eq!(
        h.orchestrator.list_proposals(&mentee(), &mentee()).await.unwrap(),
        vec![proposed.clone()]
    );

    let err = h
        .orchestrator
        .accept_proposal(proposed.id, 0, &mentor())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Unauthorized(_)));

    let moved = h
        .orchestrator
        .accept_proposal(proposed.id, 1, &mentee())
        .await
        .unwrap();
    assert_eq!(moved.time_range, range((16, 0), (17, 0)));
    assert!(h.orchestrator.list_proposals(&mentee(), &mentee()).await.unwrap().is_empty());

    h.notifier.flush().await;
    assert!(
        mailer
            .sent_to(&email_of(MENTEE))
            .iter()
            .any(|m| m.subject.starts_with("New times proposed"))
    );
    assert!(
        mailer
            .sent_to(&email_of(MENTOR))
            .iter()
            .any(|m| m.subject.starts_with("Rescheduled"))
    );
}

#[tokio::test]
async fn reschedule_validates_each_range() {
    let (h, _) = Harness::with_recording_mailer().await;
    let booked = h
        .orchestrator
        .book(fixtures::coffee_chat(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();

    let err = h
        .orchestrator
        .propose_reschedule(
            proposal(
                booked.id,
                &[
                    ("2025-03-03T14:00:00Z", "2025-03-03T15:00:00Z"),
                    ("2025-03-03T18:00:00Z", "2025-03-03T17:00:00Z"),
                ],
            ),
            &mentor(),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("proposed_time_ranges[1]"));

    let mut wrong_parties = proposal(booked.id, &[("2025-03-03T14:00:00Z", "2025-03-03T15:00:00Z")]);
    wrong_parties.receiver = OTHER_MENTEE.into();
    let err = h
        .orchestrator
        .propose_reschedule(wrong_parties, &mentor())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn accepting_into_a_taken_slot_conflicts() {
    let (h, _) = Harness::with_recording_mailer().await;
    let first = h
        .orchestrator
        .book(fixtures::coffee_chat(range((10, 0), (11, 0))), &mentee())
        .await
        .unwrap();
    h.orchestrator
        .book(fixtures::coffee_chat(range((14, 0), (15, 0))), &mentee())
        .await
        .unwrap();

    let proposed = h
        .orchestrator
        .propose_reschedule(
            proposal(first.id, &[("2025-03-03T14:30:00Z", "2025-03-03T15:30:00Z")]),
            &mentor(),
        )
        .await
        .unwrap();
    let err = h
        .orchestrator
        .accept_proposal(proposed.id, 0, &mentee())
        .await
        .unwrap_err();
    assert_eq!(err, BookingError::Conflict(ConflictKind::SlotBooked));

    let err = h
        .orchestrator
        .accept_proposal(proposed.id, 5, &mentee())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}
