//! Profiles and weekly availability.

use crate::rows::{MentorRow, UserRow, WindowRow, cents, db, weekday_number};
use async_trait::async_trait;
use mentorship_core::availability::AvailabilityWindow;
use mentorship_core::error::Result;
use mentorship_core::providers::{AvailabilityStore, ProfileDirectory};
use mentorship_core::types::{MentorProfile, UserId, UserProfile};
use sqlx::PgPool;

/// User, mentor and availability tables.
#[derive(Clone)]
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    /// Creates a new directory over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileDirectory for PostgresDirectory {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db("get user"))?;
        Ok(row.map(UserProfile::from))
    }

    async fn get_mentor(&self, user_id: &UserId) -> Result<Option<MentorProfile>> {
        let row: Option<MentorRow> = sqlx::query_as("SELECT * FROM mentors WHERE user_id = $1")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db("get mentor"))?;
        row.map(MentorProfile::try_from).transpose()
    }

    async fn upsert_user(&self, profile: UserProfile) -> Result<UserProfile> {
        // created_at keeps its first value
        let row: UserRow = sqlx::query_as(
            r"
            INSERT INTO users (user_id, email, display_name, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET email = EXCLUDED.email, display_name = EXCLUDED.display_name
            RETURNING *
            ",
        )
        .bind(profile.user_id.as_str())
        .bind(&profile.email)
        .bind(&profile.display_name)
        .bind(profile.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db("upsert user"))?;
        Ok(row.into())
    }

    async fn upsert_mentor(&self, profile: MentorProfile) -> Result<MentorProfile> {
        let services: Vec<String> = profile.services.iter().map(ToString::to_string).collect();
        sqlx::query(
            r"
            INSERT INTO mentors (user_id, headline, bio, hourly_rate, services)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE
            SET headline = EXCLUDED.headline,
                bio = EXCLUDED.bio,
                hourly_rate = EXCLUDED.hourly_rate,
                services = EXCLUDED.services
            ",
        )
        .bind(profile.user_id.as_str())
        .bind(&profile.headline)
        .bind(&profile.bio)
        .bind(cents(profile.hourly_rate)?)
        .bind(&services)
        .execute(&self.pool)
        .await
        .map_err(db("upsert mentor"))?;
        Ok(profile)
    }
}

#[async_trait]
impl AvailabilityStore for PostgresDirectory {
    async fn schedule(&self, mentor_id: &UserId) -> Result<Vec<AvailabilityWindow>> {
        let rows: Vec<WindowRow> = sqlx::query_as(
            r"
            SELECT weekday, start_time, end_time FROM availability_windows
            WHERE mentor_id = $1
            ORDER BY weekday, start_time
            ",
        )
        .bind(mentor_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db("load availability"))?;
        rows.into_iter().map(AvailabilityWindow::try_from).collect()
    }

    async fn replace_schedule(&self, mentor_id: &UserId, windows: Vec<AvailabilityWindow>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db("begin transaction"))?;

        sqlx::query("DELETE FROM availability_windows WHERE mentor_id = $1")
            .bind(mentor_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db("clear availability"))?;

        for window in &windows {
            sqlx::query(
                r"
                INSERT INTO availability_windows (mentor_id, weekday, start_time, end_time)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(mentor_id.as_str())
            .bind(weekday_number(window.weekday))
            .bind(window.start_time)
            .bind(window.end_time)
            .execute(&mut *tx)
            .await
            .map_err(db("insert availability"))?;
        }

        tx.commit().await.map_err(db("commit availability"))?;
        Ok(())
    }
}
