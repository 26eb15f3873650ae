//! Custom Axum extractors.
//!
//! - `SessionUser`: the authenticated caller, resolved from the bearer token
//! - `PaymentWebhook`: proof that a request comes from the payment processor
//! - `ApiJson` / `ApiQuery`: body and query extraction whose rejections use
//!   the API's error envelope
//! - `CorrelationId`: the request's correlation id

use crate::error::ApiError;
use crate::middleware::CORRELATION_ID_HEADER;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query},
    http::request::Parts,
};
use mentorship_core::types::UserId;
use uuid::Uuid;

/// Header carrying the payment webhook secret.
pub const WEBHOOK_SECRET_HEADER: &str = "X-Webhook-Secret";

/// Bearer token extracted from `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| ApiError::unauthorized("expected 'Bearer <token>' authorization"))?;
        if token.is_empty() {
            return Err(ApiError::unauthorized("empty bearer token"));
        }

        Ok(Self(token.to_string()))
    }
}

/// Authenticated caller.
///
/// Use as a handler parameter to require a valid session.
#[derive(Debug, Clone)]
pub struct SessionUser {
    /// The authenticated user ID
    pub user_id: UserId,
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;
        let user_id = state.sessions.verify(&bearer.0).await?;
        Ok(Self { user_id })
    }
}

/// A request that presented the configured payment webhook secret.
#[derive(Debug, Clone, Copy)]
pub struct PaymentWebhook;

#[async_trait]
impl FromRequestParts<AppState> for PaymentWebhook {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.webhook_secret.as_deref() else {
            tracing::warn!("Payment webhook called but no webhook secret is configured");
            return Err(ApiError::unauthorized("payment webhook is disabled"));
        };

        let presented = parts
            .headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !constant_time_eq::constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
            return Err(ApiError::unauthorized("invalid webhook secret"));
        }
        Ok(Self)
    }
}

/// JSON body whose rejection is rendered with the API envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejection is rendered with the API envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Correlation ID for request tracing.
///
/// Reads the id stored by the correlation middleware, then the
/// `X-Correlation-ID` header, and generates one as a last resort.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }
        let id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);
        Ok(Self(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn bearer(header: Option<&str>) -> Result<BearerToken, ApiError> {
        let mut builder = Request::builder();
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        let (mut parts, ()) = builder.body(()).expect("Valid request").into_parts();
        BearerToken::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn bearer_token_is_trimmed() {
        let token = bearer(Some("Bearer  user_mentee ")).await.unwrap();
        assert_eq!(token.0, "user_mentee");
    }

    #[tokio::test]
    async fn missing_or_malformed_authorization_is_401() {
        for header in [None, Some("Basic abc"), Some("Bearer ")] {
            let err = bearer(header).await.unwrap_err();
            assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn correlation_id_prefers_middleware_extension() {
        let stored = Uuid::new_v4();
        let (mut parts, ()) = Request::builder()
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .body(())
            .expect("Valid request")
            .into_parts();
        parts.extensions.insert(stored);

        let id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(id.0, stored);
    }
}
