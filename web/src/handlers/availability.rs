//! Mentor availability: free/busy queries and weekly schedules.

use crate::extractors::{ApiJson, ApiQuery, SessionUser};
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, State};
use chrono::{NaiveTime, Weekday};
use mentorship_core::availability::{AvailabilityWindow, FreeBusy};
use mentorship_core::error::{BookingError, Result};
use mentorship_core::time_range::TimeRange;
use mentorship_core::types::UserId;
use serde::Deserialize;

/// `?from=...&to=...` in RFC 3339.
#[derive(Debug, Deserialize)]
pub struct FreeBusyQuery {
    /// Window start
    pub from: String,
    /// Window end
    pub to: String,
}

/// One weekly window as sent by clients.
#[derive(Debug, Deserialize)]
pub struct WindowRequest {
    /// Day name, e.g. `mon` or `Monday`
    pub weekday: String,
    /// `HH:MM` or `HH:MM:SS`, UTC
    pub start_time: String,
    /// `HH:MM` or `HH:MM:SS`, UTC
    pub end_time: String,
}

/// Body of `POST /availability/update`.
#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    /// The complete new schedule
    pub windows: Vec<WindowRequest>,
}

fn time_of_day(field: &str, raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| BookingError::Validation(format!("{field} must be HH:MM, got {raw:?}")))
}

impl WindowRequest {
    fn into_window(self, index: usize) -> Result<AvailabilityWindow> {
        let weekday: Weekday = self.weekday.trim().parse().map_err(|_| {
            BookingError::Validation(format!("windows[{index}]: unknown weekday {:?}", self.weekday))
        })?;
        let start = time_of_day("start_time", &self.start_time)?;
        let end = time_of_day("end_time", &self.end_time)?;
        AvailabilityWindow::new(weekday, start, end).map_err(|e| match e {
            BookingError::Validation(message) => {
                BookingError::Validation(format!("windows[{index}]: {message}"))
            }
            other => other,
        })
    }
}

/// Free and busy intervals of a mentor. Public.
pub async fn free_busy(
    State(state): State<AppState>,
    Path(mentor_id): Path<String>,
    ApiQuery(query): ApiQuery<FreeBusyQuery>,
) -> ApiResult<FreeBusy> {
    let mentor_id = UserId::parse("mentor_id", &mentor_id)?;
    let range = TimeRange::parse(&query.from, &query.to)?;
    let free_busy = state.availability.free_busy(&mentor_id, &range).await?;
    Ok(ApiResponse::ok("ok", free_busy))
}

/// A mentor's weekly schedule. Public.
pub async fn schedule(
    State(state): State<AppState>,
    Path(mentor_id): Path<String>,
) -> ApiResult<Vec<AvailabilityWindow>> {
    let mentor_id = UserId::parse("mentor_id", &mentor_id)?;
    let windows = state.availability.schedule(&mentor_id).await?;
    Ok(ApiResponse::ok("ok", windows))
}

/// Replace the caller's weekly schedule.
pub async fn update(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<ScheduleRequest>,
) -> ApiResult<Vec<AvailabilityWindow>> {
    let windows = body
        .windows
        .into_iter()
        .enumerate()
        .map(|(index, window)| window.into_window(index))
        .collect::<Result<Vec<_>>>()?;
    let saved = state
        .availability
        .replace_schedule(&session.user_id, windows, &session.user_id)
        .await?;
    Ok(ApiResponse::ok("availability updated", saved))
}
