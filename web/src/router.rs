//! Route table.

use crate::handlers::{appointments, availability, health, profiles, reschedule, reviews};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete router.
///
/// Health checks and public reads need no session; every other route
/// requires `Authorization: Bearer <token>` except `/appointment/paid`,
/// which is authenticated by the payment webhook secret.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health checks
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Appointments
        .route("/appointment/insert", post(appointments::insert))
        .route("/appointment/confirm", post(appointments::confirm))
        .route("/appointment/paid", post(appointments::paid))
        .route("/appointment/update", post(appointments::update))
        .route("/appointment/cancel", post(appointments::cancel))
        .route("/appointment/complete", post(appointments::complete))
        .route("/appointment/noshow", post(appointments::no_show))
        .route("/appointment/checkout", post(appointments::checkout))
        .route("/appointment/:id", get(appointments::get_appointment))
        .route("/appointments/user/:id", get(appointments::list_for_user))
        // Rescheduling
        .route("/appointment/reschedule", post(reschedule::propose))
        .route("/reschedule_proposal/accept", post(reschedule::accept))
        .route("/reschedule_proposal/:id", get(reschedule::list))
        // Reviews
        .route("/reviews/insert", post(reviews::insert))
        .route("/reviews/delete", post(reviews::delete))
        .route("/reviews/:reviewee", get(reviews::list))
        // Profiles
        .route("/profile/upsert", post(profiles::upsert))
        .route("/profile/mentor", post(profiles::upsert_mentor))
        .route("/profile/:id", get(profiles::get_profile))
        // Availability
        .route("/availability/update", post(availability::update))
        .route("/availability/:mentor_id", get(availability::free_busy))
        .route("/availability/:mentor_id/schedule", get(availability::schedule))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
