//! Success envelope.

use crate::error::ApiError;
use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// `{"code": 0, "message": ..., "data": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    code: u8,
    message: String,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap `data` in a success envelope.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: 0,
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// What every handler returns.
pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
