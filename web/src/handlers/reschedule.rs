//! Reschedule proposals.

use crate::extractors::{ApiJson, SessionUser};
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, State};
use mentorship_booking::ProposalDraft;
use mentorship_core::types::{Appointment, ProposalId, RescheduleProposal, UserId};
use serde::Deserialize;

/// Body of `POST /appointment/reschedule`.
#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    /// Appointment to move
    pub appointment_id: String,
    /// `[[start, end], ...]` in RFC 3339
    pub proposed_time_ranges: Vec<(String, String)>,
    /// Party who must accept
    pub receiver: String,
    /// Party proposing (the caller)
    pub proposer: String,
}

/// Body of `POST /reschedule_proposal/accept`.
#[derive(Debug, Deserialize)]
pub struct AcceptRequest {
    /// Proposal being answered
    pub proposal_id: String,
    /// Position of the chosen range in `proposed_time_ranges`
    pub index: usize,
}

/// Offer alternative times for a confirmed appointment.
pub async fn propose(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<RescheduleRequest>,
) -> ApiResult<RescheduleProposal> {
    let draft = ProposalDraft {
        appointment_id: body.appointment_id.parse()?,
        proposed_time_ranges: body.proposed_time_ranges,
        receiver: UserId::parse("receiver", &body.receiver)?,
        proposer: UserId::parse("proposer", &body.proposer)?,
    };
    let proposal = state.orchestrator.propose_reschedule(draft, &session.user_id).await?;
    Ok(ApiResponse::ok("reschedule proposed", proposal))
}

/// Proposals waiting for the caller, newest first.
pub async fn list(
    State(state): State<AppState>,
    session: SessionUser,
    Path(receiver): Path<String>,
) -> ApiResult<Vec<RescheduleProposal>> {
    let receiver = UserId::parse("receiver", &receiver)?;
    let proposals = state.orchestrator.list_proposals(&receiver, &session.user_id).await?;
    Ok(ApiResponse::ok("ok", proposals))
}

/// Move the appointment to one of the proposed ranges.
pub async fn accept(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<AcceptRequest>,
) -> ApiResult<Appointment> {
    let proposal_id: ProposalId = body.proposal_id.parse()?;
    let appointment = state
        .orchestrator
        .accept_proposal(proposal_id, body.index, &session.user_id)
        .await?;
    Ok(ApiResponse::ok("appointment rescheduled", appointment))
}
