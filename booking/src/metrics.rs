//! Prometheus metrics for booking operations.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `booking_reservations_total` - Successful reservations
//! - `booking_conflicts_total{kind}` - Rejected reservations (`held`, `booked`)
//! - `booking_transitions_total{to}` - Status changes by target status
//! - `booking_payments_total{outcome}` - Pay-confirmations (`recorded`, `duplicate`)
//! - `booking_payments_refund_required_total{status}` - Payments for
//!   appointments that can no longer be confirmed
//! - `booking_notifications_total{outcome}` - Emails (`sent`, `failed`)
//! - `booking_hold_sweeps_total` - Sweeper runs
//! - `booking_stale_holds_released_total` - Holds released by TTL
//! - `booking_retry_attempts_total`, `booking_retry_exhausted_total`
//!
//! ## Gauges
//! - `booking_notification_queue_depth` - Notifications waiting for the worker
//!
//! ## Histograms
//! - `booking_reserve_duration_seconds` - Time spent in the atomic reservation

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use mentorship_core::error::ConflictKind;
use mentorship_core::types::AppointmentStatus;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder plus the address its scrape endpoint is served on.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the global recorder and register metric descriptions.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed. A recorder
    /// that is already installed is tolerated with a warning.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                register_metrics();
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Address the scrape endpoint should listen on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!("booking_reservations_total", "Successful slot reservations");
    describe_counter!(
        "booking_conflicts_total",
        "Reservations rejected because the slot was held or booked"
    );
    describe_histogram!(
        "booking_reserve_duration_seconds",
        "Time spent in the atomic hold+appointment reservation"
    );
    describe_counter!(
        "booking_transitions_total",
        "Appointment status transitions by target status"
    );
    describe_counter!(
        "booking_payments_total",
        "Pay-confirmations by outcome (recorded, duplicate)"
    );
    describe_counter!(
        "booking_payments_refund_required_total",
        "Payments received for appointments already canceled or finished; each one needs a refund"
    );
    describe_counter!(
        "booking_notifications_total",
        "Notification emails by outcome (sent, failed)"
    );
    describe_gauge!(
        "booking_notification_queue_depth",
        "Notifications waiting for the dispatcher worker"
    );
    describe_counter!("booking_hold_sweeps_total", "Stale-hold sweeper runs");
    describe_counter!(
        "booking_stale_holds_released_total",
        "Holds released because their TTL elapsed"
    );
    describe_counter!("booking_retry_attempts_total", "Retries of outbound calls");
    describe_counter!(
        "booking_retry_exhausted_total",
        "Outbound calls that failed after every retry"
    );
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a successful reservation.
pub fn record_reservation(duration: Duration) {
    metrics::counter!("booking_reservations_total").increment(1);
    metrics::histogram!("booking_reserve_duration_seconds").record(duration.as_secs_f64());
}

/// Record a rejected reservation.
pub fn record_conflict(kind: ConflictKind) {
    metrics::counter!("booking_conflicts_total", "kind" => kind.as_str()).increment(1);
}

/// Record a status transition.
pub fn record_transition(to: AppointmentStatus) {
    metrics::counter!("booking_transitions_total", "to" => to.as_str()).increment(1);
}

/// Record a pay-confirmation; `duplicate` when payment was already on file.
pub fn record_payment(duplicate: bool) {
    let outcome = if duplicate { "duplicate" } else { "recorded" };
    metrics::counter!("booking_payments_total", "outcome" => outcome).increment(1);
}

/// Record a payment that arrived for an appointment in `status`.
pub fn record_refund_required(status: AppointmentStatus) {
    metrics::counter!("booking_payments_refund_required_total", "status" => status.as_str()).increment(1);
}

/// Record a notification delivery attempt outcome.
pub fn record_notification(sent: bool) {
    let outcome = if sent { "sent" } else { "failed" };
    metrics::counter!("booking_notifications_total", "outcome" => outcome).increment(1);
}

/// Adjust the dispatcher queue depth gauge.
pub fn record_queue_depth(delta: f64) {
    metrics::gauge!("booking_notification_queue_depth").increment(delta);
}

/// Record one sweeper run.
#[allow(clippy::cast_possible_truncation)]
pub fn record_sweep(released: usize) {
    metrics::counter!("booking_hold_sweeps_total").increment(1);
    metrics::counter!("booking_stale_holds_released_total").increment(released as u64);
}
