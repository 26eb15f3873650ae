//! Appointment endpoints.
//!
//! - `POST /appointment/insert`: book a session
//! - `POST /appointment/confirm`: mentor confirms a pending booking
//! - `POST /appointment/paid`: payment processor webhook
//! - `POST /appointment/update`: generic status / time-slot update
//! - `POST /appointment/cancel`, `/complete`, `/noshow`
//! - `POST /appointment/checkout`: start a hosted checkout
//! - `GET /appointment/:id`, `GET /appointments/user/:id`

use crate::error::ApiError;
use crate::extractors::{ApiJson, CorrelationId, PaymentWebhook, SessionUser};
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, State};
use mentorship_core::gateways::CheckoutSession;
use mentorship_core::time_range::TimeRange;
use mentorship_core::types::{
    Appointment, AppointmentDraft, AppointmentId, AppointmentStatus, AppointmentUpdate,
    PaymentConfirmation, UserId,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request / Response Types
// ============================================================================

/// Body naming a single appointment.
#[derive(Debug, Deserialize)]
pub struct AppointmentRef {
    /// Appointment to act on
    pub appointment_id: String,
}

impl AppointmentRef {
    fn id(&self) -> Result<AppointmentId, ApiError> {
        Ok(self.appointment_id.parse()?)
    }
}

/// Result of booking.
#[derive(Debug, Serialize)]
pub struct BookedResponse {
    /// New appointment
    pub appointment_id: AppointmentId,
    /// `confirmed` for free sessions, `pending` otherwise
    pub status: AppointmentStatus,
}

/// Result of the payment webhook.
#[derive(Debug, Serialize)]
pub struct PaidResponse {
    /// Paid appointment
    pub appointment_id: AppointmentId,
    /// Status after payment
    pub status: AppointmentStatus,
    /// `true` when this payment had already been recorded
    pub already_paid: bool,
}

/// New start and end for an appointment.
#[derive(Debug, Deserialize)]
pub struct TimeSlot {
    /// RFC 3339 start
    pub start_time: String,
    /// RFC 3339 end
    pub end_time: String,
}

/// Body of `POST /appointment/update`.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    /// Appointment to update
    pub appointment_id: String,
    /// Move the appointment
    pub time_slot: Option<TimeSlot>,
    /// One of `confirmed`, `completed`, `canceled`, `noshow`
    pub status: Option<String>,
}

impl UpdateRequest {
    fn into_update(self) -> Result<(AppointmentId, AppointmentUpdate), ApiError> {
        let id = self.appointment_id.parse()?;
        let status = self
            .status
            .as_deref()
            .map(AppointmentStatus::parse)
            .transpose()?;
        if status == Some(AppointmentStatus::Pending) {
            return Err(ApiError::rejected(
                "status must be one of confirmed, completed, canceled, noshow",
            ));
        }
        let time_range = self
            .time_slot
            .map(|slot| TimeRange::parse(&slot.start_time, &slot.end_time))
            .transpose()?;

        let update = AppointmentUpdate { status, time_range };
        if update.is_empty() {
            return Err(ApiError::rejected("nothing to update"));
        }
        Ok((id, update))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Book a session as the mentee.
///
/// Free service types come back `confirmed`; paid ones stay `pending` behind
/// a hold until the payment webhook fires.
pub async fn insert(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(draft): ApiJson<AppointmentDraft>,
) -> ApiResult<BookedResponse> {
    let appointment = state.orchestrator.book(draft, &session.user_id).await?;
    let message = if appointment.status == AppointmentStatus::Confirmed {
        "appointment confirmed"
    } else {
        "appointment reserved, awaiting payment"
    };
    Ok(ApiResponse::ok(
        message,
        BookedResponse {
            appointment_id: appointment.id,
            status: appointment.status,
        },
    ))
}

/// Confirm a pending booking as the mentor.
pub async fn confirm(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<AppointmentRef>,
) -> ApiResult<Appointment> {
    let appointment = state.orchestrator.confirm(body.id()?, &session.user_id).await?;
    Ok(ApiResponse::ok("appointment confirmed", appointment))
}

/// Payment processor callback. Authenticated by the webhook secret, not a
/// session. Repeated deliveries succeed without side effects.
pub async fn paid(
    State(state): State<AppState>,
    _webhook: PaymentWebhook,
    correlation_id: CorrelationId,
    ApiJson(body): ApiJson<AppointmentRef>,
) -> ApiResult<PaidResponse> {
    let id = body.id()?;
    tracing::info!(correlation_id = %correlation_id.0, appointment_id = %id, "Payment webhook received");

    let confirmation = state.orchestrator.confirm_paid(id).await?;
    let already_paid = matches!(confirmation, PaymentConfirmation::AlreadyPaid(_));
    let appointment = confirmation.appointment();
    Ok(ApiResponse::ok(
        if already_paid { "payment already recorded" } else { "payment recorded" },
        PaidResponse {
            appointment_id: appointment.id,
            status: appointment.status,
            already_paid,
        },
    ))
}

/// Generic update. Rejected while the appointment is pending.
pub async fn update(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<UpdateRequest>,
) -> ApiResult<Appointment> {
    let (id, update) = body.into_update()?;
    let appointment = state.orchestrator.update(id, update, &session.user_id).await?;
    Ok(ApiResponse::ok("appointment updated", appointment))
}

/// Cancel as either party.
pub async fn cancel(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<AppointmentRef>,
) -> ApiResult<Appointment> {
    let appointment = state.orchestrator.cancel(body.id()?, &session.user_id).await?;
    Ok(ApiResponse::ok("appointment canceled", appointment))
}

/// Record that the session took place, as the mentor.
pub async fn complete(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<AppointmentRef>,
) -> ApiResult<Appointment> {
    let appointment = state.orchestrator.complete(body.id()?, &session.user_id).await?;
    Ok(ApiResponse::ok("appointment completed", appointment))
}

/// Record that the mentee did not show up, as the mentor.
pub async fn no_show(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<AppointmentRef>,
) -> ApiResult<Appointment> {
    let appointment = state.orchestrator.mark_no_show(body.id()?, &session.user_id).await?;
    Ok(ApiResponse::ok("appointment marked as no-show", appointment))
}

/// Create a hosted checkout for a pending, priced booking.
pub async fn checkout(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<AppointmentRef>,
) -> ApiResult<CheckoutSession> {
    let checkout = state.orchestrator.begin_checkout(body.id()?, &session.user_id).await?;
    Ok(ApiResponse::ok("checkout created", checkout))
}

/// Fetch one appointment the caller takes part in.
pub async fn get_appointment(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<String>,
) -> ApiResult<Appointment> {
    let id: AppointmentId = id.parse()?;
    let appointment = state.orchestrator.get(id, &session.user_id).await?;
    Ok(ApiResponse::ok("ok", appointment))
}

/// Every appointment of the caller, as mentor or mentee.
pub async fn list_for_user(
    State(state): State<AppState>,
    session: SessionUser,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<Appointment>> {
    let user = UserId::parse("user_id", &user_id)?;
    let appointments = state.orchestrator.list_for_user(&user, &session.user_id).await?;
    Ok(ApiResponse::ok("ok", appointments))
}
