//! Profile endpoints.

use crate::extractors::{ApiJson, SessionUser};
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, State};
use mentorship_booking::{MentorInput, ProfileInput};
use mentorship_core::types::{MentorProfile, UserId, UserProfile};
use serde::{Deserialize, Serialize};

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    /// Basic profile
    pub user: UserProfile,
    /// Present for mentors
    pub mentor: Option<MentorProfile>,
}

/// Body of `POST /profile/upsert`.
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    /// Contact address
    pub email: String,
    /// Name shown to others
    pub display_name: String,
}

/// Body of `POST /profile/mentor`.
#[derive(Debug, Deserialize)]
pub struct MentorRequest {
    /// One-line pitch
    pub headline: String,
    /// Longer description
    #[serde(default)]
    pub bio: String,
    /// Cents per hour
    pub hourly_rate: u64,
    /// Offered service types
    pub services: Vec<String>,
}

/// Fetch a user's public profile.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ProfileResponse> {
    let user_id = UserId::parse("user_id", &user_id)?;
    let (user, mentor) = state.profiles.get(&user_id).await?;
    Ok(ApiResponse::ok("ok", ProfileResponse { user, mentor }))
}

/// Create or update the caller's profile.
pub async fn upsert(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<ProfileRequest>,
) -> ApiResult<UserProfile> {
    let input = ProfileInput {
        email: body.email,
        display_name: body.display_name,
    };
    let profile = state.profiles.upsert(&session.user_id, input).await?;
    Ok(ApiResponse::ok("profile saved", profile))
}

/// Create or update the caller's mentor profile.
pub async fn upsert_mentor(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<MentorRequest>,
) -> ApiResult<MentorProfile> {
    let input = MentorInput {
        headline: body.headline,
        bio: body.bio,
        hourly_rate: body.hourly_rate,
        services: body.services,
    };
    let profile = state.profiles.upsert_mentor(&session.user_id, input).await?;
    Ok(ApiResponse::ok("mentor profile saved", profile))
}
