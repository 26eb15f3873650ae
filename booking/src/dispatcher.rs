//! Notification dispatcher.
//!
//! Booking operations hand [`BookingEvent`]s to the dispatcher and return
//! immediately. A single worker task looks up both parties, renders the
//! templates and sends the mentor and mentee emails concurrently. Delivery
//! failures are retried with backoff, then logged and counted. They never
//! reach the caller.

use crate::metrics;
use crate::retry::{RetryPolicy, retry_with_predicate};
use crate::templates::{self, BookingEvent};
use mentorship_core::gateways::{DeliveryError, EmailMessage, Mailer};
use mentorship_core::providers::ProfileDirectory;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

enum Command {
    Deliver(BookingEvent),
    Flush(oneshot::Sender<()>),
}

/// Handle for queueing notifications. Cheap to clone.
#[derive(Clone, Debug)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<Command>,
}

impl NotificationDispatcher {
    /// Start the worker task.
    ///
    /// The worker stops once every handle has been dropped and the queue is
    /// drained; the returned `JoinHandle` resolves then.
    #[must_use]
    pub fn spawn(
        mailer: Arc<dyn Mailer>,
        directory: Arc<dyn ProfileDirectory>,
        retry: RetryPolicy,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            mailer,
            directory,
            retry,
        };
        let handle = tokio::spawn(worker.run(rx));
        (Self { tx }, handle)
    }

    /// Queue an event. Never blocks and never fails; a stopped worker is logged.
    pub fn notify(&self, event: BookingEvent) {
        let label = event.label();
        let appointment_id = event.appointment().id;
        if self.tx.send(Command::Deliver(event)).is_err() {
            error!(%appointment_id, event = label, "Notification worker stopped, dropping event");
            metrics::record_notification(false);
            return;
        }
        metrics::record_queue_depth(1.0);
        debug!(%appointment_id, event = label, "Notification queued");
    }

    /// Wait until every event queued before this call has been processed.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

struct Worker {
    mailer: Arc<dyn Mailer>,
    directory: Arc<dyn ProfileDirectory>,
    retry: RetryPolicy,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Deliver(event) => {
                    metrics::record_queue_depth(-1.0);
                    self.deliver(&event).await;
                }
                Command::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!("Notification worker stopped");
    }

    async fn deliver(&self, event: &BookingEvent) {
        let appointment = event.appointment();
        let (mentor, mentee) = tokio::join!(
            self.directory.get_user(&appointment.mentor_id),
            self.directory.get_user(&appointment.mentee_id),
        );
        let (mentor, mentee) = match (mentor, mentee) {
            (Ok(Some(mentor)), Ok(Some(mentee))) => (mentor, mentee),
            (mentor, mentee) => {
                warn!(
                    appointment_id = %appointment.id,
                    event = event.label(),
                    mentor_found = matches!(mentor, Ok(Some(_))),
                    mentee_found = matches!(mentee, Ok(Some(_))),
                    "Cannot resolve recipients, notification skipped"
                );
                metrics::record_notification(false);
                return;
            }
        };

        let envelope = templates::render(event, &mentor, &mentee);
        tokio::join!(
            self.send(envelope.mentor.as_ref(), event),
            self.send(envelope.mentee.as_ref(), event),
        );
    }

    async fn send(&self, message: Option<&EmailMessage>, event: &BookingEvent) {
        let Some(message) = message else {
            return;
        };
        let result = retry_with_predicate(
            &self.retry,
            || self.mailer.send(message),
            DeliveryError::is_transient,
        )
        .await;

        match result {
            Ok(()) => {
                debug!(to = %message.to, event = event.label(), "Notification sent");
                metrics::record_notification(true);
            }
            Err(e) => {
                error!(
                    to = %message.to,
                    appointment_id = %event.appointment().id,
                    event = event.label(),
                    error = %e,
                    "Notification failed"
                );
                metrics::record_notification(false);
            }
        }
    }
}
