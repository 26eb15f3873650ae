//! Error responses for web handlers.
//!
//! Every failure is rendered as `{"code": 1, "message": ...}`. The HTTP
//! status stays 200 for business failures so clients branch on `code`; only
//! authorization (401), appointment lookups (404), slot conflicts (409) and
//! downstream failures (500) change it.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mentorship_core::error::BookingError;
use serde::Serialize;
use std::fmt;

/// Message shown for every downstream failure. Details go to the log only.
pub const INTERNAL_MESSAGE: &str = "something went wrong, please try again later";

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    /// Downstream failure kept for logging, never sent to the client
    source: Option<BookingError>,
}

impl ApiError {
    /// A business failure reported with HTTP 200 and `code: 1`.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            source: None,
        }
    }

    /// A 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
            source: None,
        }
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        let status = match &err {
            BookingError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            BookingError::NotFound { entity: "appointment", .. } => StatusCode::NOT_FOUND,
            BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::Downstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::OK,
        };
        if status.is_server_error() {
            return Self {
                status,
                message: INTERNAL_MESSAGE.to_string(),
                source: Some(err),
            };
        }
        Self {
            status,
            message: err.to_string(),
            source: None,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::rejected(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::rejected(format!("invalid query string: {}", rejection.body_text()))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: u8,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Some(source) = &self.source {
            tracing::error!(status = %self.status, error = %source, "Request failed downstream");
        } else if self.status == StatusCode::UNAUTHORIZED {
            tracing::warn!(message = %self.message, "Request rejected as unauthorized");
        } else {
            tracing::debug!(status = %self.status, message = %self.message, "Request rejected");
        }

        let body = ErrorBody {
            code: 1,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
