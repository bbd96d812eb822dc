// libs/notification-cell/src/services/dispatcher.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::models::{NotificationEvent, OutboundMessage, RetryPolicy};
use crate::services::channel::SendChannel;

/// Invoked when a message exhausts its retries, so the owning appointment
/// can carry a persistent "undelivered" marker for the operator to act on.
#[async_trait]
pub trait DeliveryFailureSink: Send + Sync {
    async fn delivery_failed(&self, appointment_id: Uuid);
}

pub struct NoopFailureSink;

#[async_trait]
impl DeliveryFailureSink for NoopFailureSink {
    async fn delivery_failed(&self, _appointment_id: Uuid) {}
}

struct QueuedMessage {
    appointment_id: Uuid,
    message: OutboundMessage,
}

/// Turns lifecycle events into outbound messages - one to the patient, one
/// to clinic staff - and queues them for a background worker.
///
/// `dispatch` is fire-and-forget: it never blocks and never fails the
/// transition that triggered it. The worker retries each message with
/// exponential backoff up to the policy's attempt bound, then reports the
/// failure through the sink.
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<QueuedMessage>,
    clinic_name: String,
    clinic_phone: String,
}

impl NotificationDispatcher {
    pub fn start(
        channel: Arc<dyn SendChannel>,
        sink: Arc<dyn DeliveryFailureSink>,
        retry: RetryPolicy,
        clinic_name: String,
        clinic_phone: String,
    ) -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedMessage>();

        tokio::spawn(async move {
            while let Some(queued) = rx.recv().await {
                deliver_with_retry(&*channel, &*sink, &retry, queued).await;
            }
            debug!("Notification worker stopped");
        });

        Arc::new(Self {
            tx,
            clinic_name,
            clinic_phone,
        })
    }

    pub fn dispatch(&self, event: NotificationEvent) {
        let appointment_id = event.appointment_id();
        for message in self.compose(&event) {
            let queued = QueuedMessage {
                appointment_id,
                message,
            };
            if self.tx.send(queued).is_err() {
                warn!("Notification worker is gone, message dropped");
            }
        }
    }

    /// The patient message plus the staff copy. Skips the staff copy when no
    /// clinic phone is configured.
    fn compose(&self, event: &NotificationEvent) -> Vec<OutboundMessage> {
        let (patient, staff) = compose_messages(event, &self.clinic_name);
        let mut messages = vec![patient];
        if self.clinic_phone.is_empty() {
            debug!("No clinic phone configured, staff copy skipped");
        } else {
            messages.push(OutboundMessage {
                destination: self.clinic_phone.clone(),
                body: staff,
            });
        }
        messages
    }
}

async fn deliver_with_retry(
    channel: &dyn SendChannel,
    sink: &dyn DeliveryFailureSink,
    retry: &RetryPolicy,
    queued: QueuedMessage,
) {
    let attempts = retry.attempts();
    for attempt in 1..=attempts {
        match channel.send(&queued.message.destination, &queued.message.body).await {
            Ok(()) => {
                debug!(
                    "Message for {} delivered on attempt {}",
                    queued.message.destination, attempt
                );
                return;
            }
            Err(e) if attempt < attempts => {
                warn!(
                    "Send attempt {}/{} failed for {}: {}",
                    attempt, attempts, queued.message.destination, e
                );
                tokio::time::sleep(retry.delay_before(attempt)).await;
            }
            Err(e) => {
                error!(
                    "Message for {} undelivered after {} attempts: {}",
                    queued.message.destination, attempts, e
                );
                sink.delivery_failed(queued.appointment_id).await;
            }
        }
    }
}

fn slot(date: NaiveDate, time: NaiveTime) -> String {
    format!("{} at {}", date.format("%d %b %Y"), time.format("%I:%M %p"))
}

/// Message copy per event: (patient body, staff body).
pub fn compose_messages(event: &NotificationEvent, clinic_name: &str) -> (OutboundMessage, String) {
    match event {
        NotificationEvent::Confirmed {
            name,
            phone,
            service,
            date,
            time,
            ..
        } => (
            OutboundMessage {
                destination: phone.clone(),
                body: format!(
                    "Hello {}, your appointment with {} for {} on {} is CONFIRMED. We look forward to seeing you!",
                    name,
                    clinic_name,
                    service,
                    slot(*date, *time)
                ),
            },
            format!(
                "CONFIRMED: {} ({}) for {} on {}.",
                name,
                phone,
                service,
                slot(*date, *time)
            ),
        ),
        NotificationEvent::Rejected {
            name,
            phone,
            service,
            date,
            ..
        } => (
            OutboundMessage {
                destination: phone.clone(),
                body: format!(
                    "Hello {}, unfortunately, we are unable to accommodate your appointment request for {}. Please call us to find a better time.",
                    name,
                    date.format("%d %b %Y")
                ),
            },
            format!(
                "REJECTED: {} requested {} on {}.",
                name,
                service,
                date.format("%d %b %Y")
            ),
        ),
        NotificationEvent::Rescheduled {
            name,
            phone,
            service,
            old_date,
            old_time,
            new_date,
            new_time,
            ..
        } => (
            OutboundMessage {
                destination: phone.clone(),
                body: format!(
                    "Hello {}, your appointment at {} has been RESCHEDULED from {} to a new time: {}. Reply to this message if you need to make changes.",
                    name,
                    clinic_name,
                    slot(*old_date, *old_time),
                    slot(*new_date, *new_time)
                ),
            },
            format!(
                "RESCHEDULED: {} is now scheduled for {} ({}). Previously {}.",
                name,
                slot(*new_date, *new_time),
                service,
                slot(*old_date, *old_time)
            ),
        ),
    }
}
