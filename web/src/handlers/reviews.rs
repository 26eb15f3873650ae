//! Review endpoints.

use crate::extractors::{ApiJson, SessionUser};
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, State};
use mentorship_core::types::{Review, ReviewId, UserId};
use serde::Deserialize;

/// Body of `POST /reviews/insert`.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// User being reviewed
    pub reviewee: String,
    /// Author (the caller)
    pub reviewer: String,
    /// Review text
    pub content: String,
    /// 1 to 5
    pub rating: u8,
}

/// Body of `POST /reviews/delete`.
#[derive(Debug, Deserialize)]
pub struct DeleteReviewRequest {
    /// Review to delete
    pub review_id: String,
}

/// Leave a review.
pub async fn insert(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<ReviewRequest>,
) -> ApiResult<Review> {
    let reviewee = UserId::parse("reviewee", &body.reviewee)?;
    let reviewer = UserId::parse("reviewer", &body.reviewer)?;
    let review = state
        .reviews
        .submit(reviewee, reviewer, &body.content, body.rating, &session.user_id)
        .await?;
    Ok(ApiResponse::ok("review submitted", review))
}

/// Delete one of the caller's reviews. Succeeds for reviews that no longer
/// exist.
pub async fn delete(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<DeleteReviewRequest>,
) -> ApiResult<()> {
    let id: ReviewId = body.review_id.parse()?;
    state.reviews.delete(id, &session.user_id).await?;
    Ok(ApiResponse::ok("review deleted", ()))
}

/// Public list of reviews about a user.
pub async fn list(State(state): State<AppState>, Path(reviewee): Path<String>) -> ApiResult<Vec<Review>> {
    let reviewee = UserId::parse("reviewee", &reviewee)?;
    let reviews = state.reviews.list(&reviewee).await?;
    Ok(ApiResponse::ok("ok", reviews))
}
