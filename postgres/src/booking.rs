//! `PostgreSQL` appointment store and hold ledger.
//!
//! Every write that can introduce an overlap runs in a transaction holding
//! `pg_advisory_xact_lock(hashtext(mentor_id))`, so check-then-insert is
//! serialized per mentor. The `appointments_no_overlap` exclusion constraint
//! catches anything that slips past (for example rows written by hand); its
//! violation is reported as `SlotBooked`.
//!
//! Row locks are always taken appointment first, hold second.

use crate::rows::{self, AppointmentRow, HoldRow, cents, db, db_write};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mentorship_core::environment::Clock;
use mentorship_core::error::{BookingError, ConflictKind, Result};
use mentorship_core::lifecycle::{self, PaymentStep};
use mentorship_core::providers::{AppointmentStore, HoldLedger, Reservation, SweepOutcome};
use mentorship_core::time_range::TimeRange;
use mentorship_core::types::{
    Appointment, AppointmentId, AppointmentStatus, AppointmentUpdate, Hold, NewAppointment,
    PaymentConfirmation, UserId,
};
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;

/// Appointment store and hold ledger backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
    hold_ttl: Duration,
}

impl PostgresBookingStore {
    /// Create a store. Holds older than `hold_ttl` count as expired.
    #[must_use]
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, hold_ttl: Duration) -> Self {
        Self {
            pool,
            clock,
            hold_ttl,
        }
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.hold_ttl
    }
}

async fn lock_mentor(conn: &mut PgConnection, mentor_id: &UserId) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(mentor_id.as_str())
        .execute(conn)
        .await
        .map_err(db("lock mentor calendar"))?;
    Ok(())
}

/// Cancel pending appointments whose hold went stale, then release the stale
/// holds themselves. `mentor` narrows the sweep to one calendar.
async fn sweep_stale(
    conn: &mut PgConnection,
    mentor: Option<&UserId>,
    now: DateTime<Utc>,
    cutoff: DateTime<Utc>,
) -> Result<SweepOutcome> {
    let mentor = mentor.map(UserId::as_str);

    let canceled: Vec<AppointmentRow> = sqlx::query_as(
        r"
        UPDATE appointments SET status = 'canceled', updated_at = $1
        WHERE status = 'pending'
          AND id IN (
            SELECT appointment_id FROM holds
            WHERE expires_at IS NULL
              AND created_at <= $2
              AND appointment_id IS NOT NULL
              AND ($3::text IS NULL OR mentor_id = $3)
          )
        RETURNING *
        ",
    )
    .bind(now)
    .bind(cutoff)
    .bind(mentor)
    .fetch_all(&mut *conn)
    .await
    .map_err(db("cancel appointments with stale holds"))?;

    let released = sqlx::query(
        r"
        UPDATE holds SET expires_at = $1
        WHERE expires_at IS NULL
          AND created_at <= $2
          AND ($3::text IS NULL OR mentor_id = $3)
        ",
    )
    .bind(now)
    .bind(cutoff)
    .bind(mentor)
    .execute(&mut *conn)
    .await
    .map_err(db("release stale holds"))?;

    Ok(SweepOutcome {
        released_holds: usize::try_from(released.rows_affected()).unwrap_or(usize::MAX),
        canceled: rows::appointments(canceled)?,
    })
}

async fn is_held(
    conn: &mut PgConnection,
    mentor_id: &UserId,
    range: &TimeRange,
    exclude: Option<AppointmentId>,
    cutoff: DateTime<Utc>,
) -> Result<bool> {
    let (held,): (bool,) = sqlx::query_as(
        r"
        SELECT EXISTS (
            SELECT 1 FROM holds
            WHERE mentor_id = $1
              AND expires_at IS NULL
              AND created_at > $2
              AND ($5::uuid IS NULL OR appointment_id IS DISTINCT FROM $5)
              AND tstzrange(start_time, end_time, '[)') && tstzrange($3, $4, '[)')
        )
        ",
    )
    .bind(mentor_id.as_str())
    .bind(cutoff)
    .bind(range.start())
    .bind(range.end())
    .bind(exclude.map(|id| *id.as_uuid()))
    .fetch_one(conn)
    .await
    .map_err(db("check holds"))?;
    Ok(held)
}

async fn is_booked(
    conn: &mut PgConnection,
    mentor_id: &UserId,
    range: &TimeRange,
    exclude: Option<AppointmentId>,
) -> Result<bool> {
    let (booked,): (bool,) = sqlx::query_as(
        r"
        SELECT EXISTS (
            SELECT 1 FROM appointments
            WHERE mentor_id = $1
              AND status <> 'canceled'
              AND ($4::uuid IS NULL OR id <> $4)
              AND tstzrange(start_time, end_time, '[)') && tstzrange($2, $3, '[)')
        )
        ",
    )
    .bind(mentor_id.as_str())
    .bind(range.start())
    .bind(range.end())
    .bind(exclude.map(|id| *id.as_uuid()))
    .fetch_one(conn)
    .await
    .map_err(db("check appointments"))?;
    Ok(booked)
}

async fn insert_appointment(conn: &mut PgConnection, appointment: &Appointment) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO appointments
            (id, mentor_id, mentee_id, start_time, end_time, status, service_type,
             price, paid_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ",
    )
    .bind(appointment.id.as_uuid())
    .bind(appointment.mentor_id.as_str())
    .bind(appointment.mentee_id.as_str())
    .bind(appointment.time_range.start())
    .bind(appointment.time_range.end())
    .bind(appointment.status.as_str())
    .bind(appointment.service_type.as_str())
    .bind(cents(appointment.price)?)
    .bind(appointment.paid_at)
    .bind(appointment.created_at)
    .bind(appointment.updated_at)
    .execute(conn)
    .await
    .map_err(db_write("insert appointment"))?;
    Ok(())
}

async fn insert_hold(conn: &mut PgConnection, hold: &Hold) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO holds
            (id, appointment_id, mentor_id, mentee_id, start_time, end_time, created_at, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ",
    )
    .bind(hold.id.as_uuid())
    .bind(hold.appointment_id.map(|id| *id.as_uuid()))
    .bind(hold.mentor_id.as_str())
    .bind(hold.mentee_id.as_str())
    .bind(hold.time_range.start())
    .bind(hold.time_range.end())
    .bind(hold.created_at)
    .bind(hold.expires_at)
    .execute(conn)
    .await
    .map_err(db("insert hold"))?;
    Ok(())
}

async fn lock_appointment(conn: &mut PgConnection, id: AppointmentId) -> Result<Appointment> {
    let row: Option<AppointmentRow> =
        sqlx::query_as("SELECT * FROM appointments WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(conn)
            .await
            .map_err(db("load appointment"))?;
    row.ok_or_else(|| BookingError::not_found("appointment", id))?
        .try_into()
}

async fn release_for(conn: &mut PgConnection, id: AppointmentId, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE holds SET expires_at = $2 WHERE appointment_id = $1 AND expires_at IS NULL")
        .bind(id.as_uuid())
        .bind(now)
        .execute(conn)
        .await
        .map_err(db("release hold"))?;
    Ok(())
}

async fn save(conn: &mut PgConnection, appointment: &Appointment) -> Result<()> {
    sqlx::query(
        r"
        UPDATE appointments
        SET start_time = $2, end_time = $3, status = $4, paid_at = $5, updated_at = $6
        WHERE id = $1
        ",
    )
    .bind(appointment.id.as_uuid())
    .bind(appointment.time_range.start())
    .bind(appointment.time_range.end())
    .bind(appointment.status.as_str())
    .bind(appointment.paid_at)
    .bind(appointment.updated_at)
    .execute(conn)
    .await
    .map_err(db_write("update appointment"))?;
    Ok(())
}

#[async_trait]
impl HoldLedger for PostgresBookingStore {
    async fn acquire(&self, mentor_id: &UserId, mentee_id: &UserId, range: TimeRange) -> Result<Hold> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(db("begin transaction"))?;
        lock_mentor(&mut tx, mentor_id).await?;
        sweep_stale(&mut tx, Some(mentor_id), now, self.cutoff(now)).await?;

        if is_held(&mut tx, mentor_id, &range, None, self.cutoff(now)).await? {
            return Err(BookingError::Conflict(ConflictKind::SlotHeld));
        }
        let hold = Hold::active(None, mentor_id.clone(), mentee_id.clone(), range, now);
        insert_hold(&mut tx, &hold).await?;

        tx.commit().await.map_err(db("commit hold"))?;
        Ok(hold)
    }

    async fn release(&self, mentor_id: &UserId, range: &TimeRange) -> Result<usize> {
        let released = sqlx::query(
            r"
            UPDATE holds SET expires_at = $4
            WHERE mentor_id = $1 AND start_time = $2 AND end_time = $3 AND expires_at IS NULL
            ",
        )
        .bind(mentor_id.as_str())
        .bind(range.start())
        .bind(range.end())
        .bind(self.clock.now())
        .execute(&self.pool)
        .await
        .map_err(db("release holds"))?;
        Ok(usize::try_from(released.rows_affected()).unwrap_or(usize::MAX))
    }

    async fn list_active(&self, mentor_id: &UserId) -> Result<Vec<Hold>> {
        let rows: Vec<HoldRow> = sqlx::query_as(
            r"
            SELECT * FROM holds
            WHERE mentor_id = $1 AND expires_at IS NULL AND created_at > $2
            ORDER BY start_time, end_time
            ",
        )
        .bind(mentor_id.as_str())
        .bind(self.cutoff(self.clock.now()))
        .fetch_all(&self.pool)
        .await
        .map_err(db("list holds"))?;
        rows.into_iter().map(Hold::try_from).collect()
    }
}

#[async_trait]
impl AppointmentStore for PostgresBookingStore {
    async fn create(&self, input: NewAppointment) -> Result<Appointment> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(db("begin transaction"))?;
        lock_mentor(&mut tx, &input.mentor_id).await?;

        if is_booked(&mut tx, &input.mentor_id, &input.time_range, None).await? {
            return Err(BookingError::Conflict(ConflictKind::SlotBooked));
        }
        let appointment = Appointment::pending(input, now);
        insert_appointment(&mut tx, &appointment).await?;

        tx.commit().await.map_err(db("commit appointment"))?;
        Ok(appointment)
    }

    async fn reserve(&self, input: NewAppointment) -> Result<Reservation> {
        let now = self.clock.now();
        let cutoff = self.cutoff(now);
        let mut tx = self.pool.begin().await.map_err(db("begin transaction"))?;
        lock_mentor(&mut tx, &input.mentor_id).await?;

        let swept = sweep_stale(&mut tx, Some(&input.mentor_id), now, cutoff).await?;
        if !swept.canceled.is_empty() {
            tracing::info!(
                mentor_id = %input.mentor_id,
                canceled = swept.canceled.len(),
                "Canceled pending appointments with stale holds"
            );
        }

        if is_held(&mut tx, &input.mentor_id, &input.time_range, None, cutoff).await? {
            return Err(BookingError::Conflict(ConflictKind::SlotHeld));
        }
        if is_booked(&mut tx, &input.mentor_id, &input.time_range, None).await? {
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
        insert_appointment(&mut tx, &appointment).await?;
        insert_hold(&mut tx, &hold).await?;

        tx.commit().await.map_err(db_write("commit reservation"))?;
        Ok(Reservation { appointment, hold })
    }

    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        let row: Option<AppointmentRow> = sqlx::query_as("SELECT * FROM appointments WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db("get appointment"))?;
        row.map(Appointment::try_from).transpose()
    }

    async fn update(&self, id: AppointmentId, update: AppointmentUpdate) -> Result<Appointment> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(db("begin transaction"))?;

        // Mentor first, so the advisory lock precedes the row lock
        let mentor: Option<(String,)> = sqlx::query_as("SELECT mentor_id FROM appointments WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db("load appointment"))?;
        let Some((mentor,)) = mentor else {
            return Err(BookingError::not_found("appointment", id));
        };
        lock_mentor(&mut tx, &UserId::from(mentor.as_str())).await?;

        let mut appointment = lock_appointment(&mut tx, id).await?;
        let plan = lifecycle::plan_update(appointment.status, &update)?;

        if let Some(range) = plan.time_range {
            if is_held(&mut tx, &appointment.mentor_id, &range, Some(id), self.cutoff(now)).await? {
                return Err(BookingError::Conflict(ConflictKind::SlotHeld));
            }
            if is_booked(&mut tx, &appointment.mentor_id, &range, Some(id)).await? {
                return Err(BookingError::Conflict(ConflictKind::SlotBooked));
            }
            appointment.time_range = range;
        }
        if let Some(status) = plan.status {
            appointment.status = status;
        }
        appointment.updated_at = now;

        save(&mut tx, &appointment).await?;
        if plan.cancels() {
            release_for(&mut tx, id, now).await?;
        }
        tx.commit().await.map_err(db_write("commit update"))?;
        Ok(appointment)
    }

    async fn confirm(&self, id: AppointmentId) -> Result<Appointment> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(db("begin transaction"))?;

        let mut appointment = lock_appointment(&mut tx, id).await?;
        appointment.status = lifecycle::confirm(appointment.status)?;
        appointment.updated_at = now;
        save(&mut tx, &appointment).await?;
        release_for(&mut tx, id, now).await?;

        tx.commit().await.map_err(db("commit confirmation"))?;
        Ok(appointment)
    }

    async fn confirm_paid(&self, id: AppointmentId) -> Result<PaymentConfirmation> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(db("begin transaction"))?;

        let mut appointment = lock_appointment(&mut tx, id).await?;
        let step = lifecycle::pay_confirmation(appointment.status, appointment.paid_at)?;
        if step == PaymentStep::AlreadyPaid {
            return Ok(PaymentConfirmation::AlreadyPaid(appointment));
        }
        if step == PaymentStep::ConfirmAndRecord {
            appointment.status = AppointmentStatus::Confirmed;
        }
        appointment.paid_at = Some(now);
        appointment.updated_at = now;
        save(&mut tx, &appointment).await?;
        release_for(&mut tx, id, now).await?;

        tx.commit().await.map_err(db("commit payment"))?;
        Ok(PaymentConfirmation::Recorded(appointment))
    }

    async fn cancel(&self, id: AppointmentId) -> Result<Appointment> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(db("begin transaction"))?;

        let mut appointment = lock_appointment(&mut tx, id).await?;
        appointment.status = lifecycle::cancel(appointment.status)?;
        appointment.updated_at = now;
        save(&mut tx, &appointment).await?;
        release_for(&mut tx, id, now).await?;

        tx.commit().await.map_err(db("commit cancellation"))?;
        Ok(appointment)
    }

    async fn list_for_mentor(&self, mentor_id: &UserId, window: &TimeRange) -> Result<Vec<Appointment>> {
        let rows: Vec<AppointmentRow> = sqlx::query_as(
            r"
            SELECT * FROM appointments
            WHERE mentor_id = $1
              AND status <> 'canceled'
              AND tstzrange(start_time, end_time, '[)') && tstzrange($2, $3, '[)')
            ORDER BY start_time, end_time
            ",
        )
        .bind(mentor_id.as_str())
        .bind(window.start())
        .bind(window.end())
        .fetch_all(&self.pool)
        .await
        .map_err(db("list mentor appointments"))?;
        rows::appointments(rows)
    }

    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Appointment>> {
        let rows: Vec<AppointmentRow> = sqlx::query_as(
            r"
            SELECT * FROM appointments
            WHERE mentor_id = $1 OR mentee_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db("list user appointments"))?;
        rows::appointments(rows)
    }

    async fn expire_stale_holds(&self) -> Result<SweepOutcome> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(db("begin transaction"))?;
        let outcome = sweep_stale(&mut tx, None, now, self.cutoff(now)).await?;
        tx.commit().await.map_err(db("commit sweep"))?;
        Ok(outcome)
    }
}
