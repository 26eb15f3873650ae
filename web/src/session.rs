//! Resolving bearer tokens to user ids.
//!
//! Identity is owned by an external provider; the API only needs to know
//! which user a token belongs to.

use async_trait::async_trait;
use mentorship_core::error::{BookingError, Result};
use mentorship_core::types::UserId;

/// Maps a session token to the user it was issued to.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    /// Resolve `token`.
    ///
    /// # Errors
    ///
    /// [`BookingError::Unauthorized`] for unknown or expired tokens,
    /// [`BookingError::Downstream`] if the provider cannot be reached.
    async fn verify(&self, token: &str) -> Result<UserId>;
}

/// Treats the token itself as the user id.
///
/// For local development and tests; never expose it to real traffic.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevSessionVerifier;

#[async_trait]
impl SessionVerifier for DevSessionVerifier {
    async fn verify(&self, token: &str) -> Result<UserId> {
        UserId::parse("session token", token)
            .map_err(|_| BookingError::Unauthorized("invalid session token".to_string()))
    }
}
