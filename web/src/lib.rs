//! HTTP API for mentorship booking.
//!
//! Thin Axum layer over `mentorship-booking`: handlers extract and validate
//! the request, resolve the session, call one orchestrator or service
//! method and wrap the result in the response envelope.
//!
//! # Envelope
//!
//! ```text
//! success  200  {"code": 0, "message": "...", "data": ...}
//! failure  200  {"code": 1, "message": "..."}   business failures
//!          401                                   session / identity mismatch
//!          404                                   unknown appointment
//!          409                                   slot held or booked
//!          500                                   downstream failure, generic message
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mentorship_web::{AppState, Backends, Wiring, build_router};
//!
//! let (state, _worker) = AppState::build(Backends::in_memory(clock.clone(), ttl), wiring);
//! let app = build_router(state);
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod session;
pub mod state;

// Re-export key types for convenience
pub use config::Config;
pub use error::ApiError;
pub use extractors::{ApiJson, CorrelationId, SessionUser};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use response::{ApiResponse, ApiResult};
pub use router::build_router;
pub use session::{DevSessionVerifier, SessionVerifier};
pub use state::{AppState, Backends, ReadinessProbe, Wiring};
