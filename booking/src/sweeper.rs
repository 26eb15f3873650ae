//! Background hold sweeper.
//!
//! Reservations already expire stale holds lazily for the mentor being
//! booked. The sweeper does the same for every mentor on a fixed interval so
//! abandoned checkouts free their slot (and notify both parties) without
//! waiting for the next booking attempt.

use crate::orchestrator::BookingOrchestrator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodically runs [`BookingOrchestrator::expire_stale_holds`].
pub struct HoldSweeper {
    orchestrator: Arc<BookingOrchestrator>,
    every: Duration,
    shutdown: watch::Receiver<bool>,
}

impl HoldSweeper {
    /// Create a sweeper and the sender that stops it (send `true`).
    #[must_use]
    pub fn new(orchestrator: Arc<BookingOrchestrator>, every: Duration) -> (Self, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        (
            Self {
                orchestrator,
                every,
                shutdown: shutdown_rx,
            },
            shutdown_tx,
        )
    }

    /// Run on a background task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Sweep until shutdown is signalled or the sender is dropped.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.every.as_secs(), "Hold sweeper started");

        while !*self.shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.orchestrator.expire_stale_holds().await {
                        // Next tick retries
                        tracing::error!(error = %e, "Hold sweep failed");
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Hold sweeper stopped");
    }
}
