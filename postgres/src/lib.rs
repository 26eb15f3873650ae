//! `PostgreSQL` persistence for mentorship booking.
//!
//! Implements every store trait from `mentorship-core` on top of a single
//! sqlx connection pool:
//!
//! - [`PostgresBookingStore`]: appointments and holds, with per-mentor
//!   advisory locks and an exclusion constraint against overlaps
//! - [`PostgresDirectory`]: user and mentor profiles plus weekly availability
//! - [`PostgresProposalStore`] and [`PostgresReviewStore`]
//!
//! # Example
//!
//! ```ignore
//! use mentorship_postgres::{PoolSettings, PostgresBookingStore, connect, migrate};
//!
//! async fn example() -> mentorship_core::Result<()> {
//!     let pool = connect("postgres://localhost/mentorship", &PoolSettings::default()).await?;
//!     migrate(&pool).await?;
//!     let store = PostgresBookingStore::new(pool, clock, chrono::Duration::minutes(15));
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod booking;
mod directory;
mod rows;
mod social;

pub use booking::PostgresBookingStore;
pub use directory::PostgresDirectory;
pub use social::{PostgresProposalStore, PostgresReviewStore};
pub use sqlx::PgPool;

use mentorship_core::error::{BookingError, Result};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Connection pool sizing.
#[derive(Clone, Debug)]
pub struct PoolSettings {
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`BookingError::Downstream`] if the database cannot be reached.
pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(database_url)
        .await
        .map_err(rows::db("connect to database"))?;

    tracing::info!(
        max_connections = settings.max_connections,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

/// Apply the bundled schema migrations.
///
/// # Errors
///
/// Returns [`BookingError::Downstream`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| BookingError::downstream("run migrations", e))?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Round-trip a trivial query, for readiness probes.
///
/// # Errors
///
/// Returns [`BookingError::Downstream`] if the database does not answer.
pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(rows::db("ping database"))?;
    Ok(())
}
