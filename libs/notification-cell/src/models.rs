// libs/notification-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// A lifecycle event that produces outbound messages. Reschedule carries
/// both the old and the new date/time so the patient message can reference
/// what changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationEvent {
    Confirmed {
        appointment_id: Uuid,
        name: String,
        phone: String,
        service: String,
        date: NaiveDate,
        time: NaiveTime,
    },
    Rejected {
        appointment_id: Uuid,
        name: String,
        phone: String,
        service: String,
        date: NaiveDate,
    },
    Rescheduled {
        appointment_id: Uuid,
        name: String,
        phone: String,
        service: String,
        old_date: NaiveDate,
        old_time: NaiveTime,
        new_date: NaiveDate,
        new_time: NaiveTime,
    },
}

impl NotificationEvent {
    pub fn appointment_id(&self) -> Uuid {
        match self {
            NotificationEvent::Confirmed { appointment_id, .. }
            | NotificationEvent::Rejected { appointment_id, .. }
            | NotificationEvent::Rescheduled { appointment_id, .. } => *appointment_id,
        }
    }
}

/// One logical message handed to the external send channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub destination: String,
    pub body: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("Send channel error: {0}")]
    Channel(String),

    #[error("Message gateway returned status {0}")]
    GatewayStatus(u16),
}

/// Bounded exponential backoff for redelivery attempts. After
/// `max_attempts` failures the message is abandoned and the appointment is
/// flagged undelivered; nothing retries indefinitely.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn delay_before(&self, attempt: u32) -> Duration {
        // attempt is 1-based; first retry waits base, then doubles.
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Effective attempt count. A misconfigured zero still sends once, so a
    /// message is never dropped without either a delivery or a failure
    /// report.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
        }
    }
}
