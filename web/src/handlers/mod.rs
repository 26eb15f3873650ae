//! HTTP request handlers, organized by domain.

pub mod appointments;
pub mod availability;
pub mod health;
pub mod profiles;
pub mod reschedule;
pub mod reviews;

pub use health::{health_check, readiness_check};
