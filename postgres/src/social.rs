//! Reschedule proposals and reviews.

use crate::rows::{ProposalRow, ReviewRow, db};
use async_trait::async_trait;
use mentorship_core::error::Result;
use mentorship_core::providers::{ProposalStore, ReviewStore};
use mentorship_core::types::{AppointmentId, ProposalId, RescheduleProposal, Review, ReviewId, UserId};
use sqlx::PgPool;
use sqlx::types::Json;

/// Reschedule proposals table.
#[derive(Clone)]
pub struct PostgresProposalStore {
    pool: PgPool,
}

impl PostgresProposalStore {
    /// Creates a new proposal store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProposalStore for PostgresProposalStore {
    async fn replace(&self, proposal: RescheduleProposal) -> Result<RescheduleProposal> {
        let mut tx = self.pool.begin().await.map_err(db("begin transaction"))?;

        sqlx::query("DELETE FROM reschedule_proposals WHERE appointment_id = $1")
            .bind(proposal.appointment_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db("delete earlier proposals"))?;

        sqlx::query(
            r"
            INSERT INTO reschedule_proposals
                (id, appointment_id, proposed_time_ranges, receiver, proposer, proposed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(proposal.id.as_uuid())
        .bind(proposal.appointment_id.as_uuid())
        .bind(Json(&proposal.proposed_time_ranges))
        .bind(proposal.receiver.as_str())
        .bind(proposal.proposer.as_str())
        .bind(proposal.proposed_at)
        .execute(&mut *tx)
        .await
        .map_err(db("insert proposal"))?;

        tx.commit().await.map_err(db("commit proposal"))?;
        Ok(proposal)
    }

    async fn get(&self, id: ProposalId) -> Result<Option<RescheduleProposal>> {
        let row: Option<ProposalRow> = sqlx::query_as("SELECT * FROM reschedule_proposals WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db("get proposal"))?;
        Ok(row.map(RescheduleProposal::from))
    }

    async fn list_for_receiver(&self, receiver: &UserId) -> Result<Vec<RescheduleProposal>> {
        let rows: Vec<ProposalRow> = sqlx::query_as(
            "SELECT * FROM reschedule_proposals WHERE receiver = $1 ORDER BY proposed_at DESC",
        )
        .bind(receiver.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db("list proposals"))?;
        Ok(rows.into_iter().map(RescheduleProposal::from).collect())
    }

    async fn delete_for_appointment(&self, appointment_id: AppointmentId) -> Result<usize> {
        let deleted = sqlx::query("DELETE FROM reschedule_proposals WHERE appointment_id = $1")
            .bind(appointment_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db("delete proposals"))?;
        Ok(usize::try_from(deleted.rows_affected()).unwrap_or(usize::MAX))
    }
}

/// Reviews table.
#[derive(Clone)]
pub struct PostgresReviewStore {
    pool: PgPool,
}

impl PostgresReviewStore {
    /// Creates a new review store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for PostgresReviewStore {
    async fn insert(&self, review: Review) -> Result<Review> {
        sqlx::query(
            r"
            INSERT INTO reviews (id, reviewee, reviewer, content, rating, creation_time)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(review.id.as_uuid())
        .bind(review.reviewee.as_str())
        .bind(review.reviewer.as_str())
        .bind(&review.content)
        .bind(i16::from(review.rating))
        .bind(review.creation_time)
        .execute(&self.pool)
        .await
        .map_err(db("insert review"))?;
        Ok(review)
    }

    async fn get(&self, id: ReviewId) -> Result<Option<Review>> {
        let row: Option<ReviewRow> = sqlx::query_as("SELECT * FROM reviews WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db("get review"))?;
        row.map(Review::try_from).transpose()
    }

    async fn delete(&self, id: ReviewId) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db("delete review"))?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn list_for_reviewee(&self, reviewee: &UserId) -> Result<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            "SELECT * FROM reviews WHERE reviewee = $1 ORDER BY creation_time DESC",
        )
        .bind(reviewee.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db("list reviews"))?;
        rows.into_iter().map(Review::try_from).collect()
    }
}
