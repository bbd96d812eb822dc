// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Rejected,
    Rescheduled,
}

impl AppointmentStatus {
    /// Whether an appointment in this status holds its slot. A rejected or
    /// rescheduled record keeps its date/time for history but the slot is
    /// free for someone else.
    pub fn holds_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Rescheduled => "rescheduled",
        };
        write!(f, "{}", label)
    }
}

/// One entry in an appointment's audit trail. `from` is `None` for the
/// creation entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: Option<AppointmentStatus>,
    pub to: AppointmentStatus,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    /// Linked on first confirmation; pending and rejected requests have no
    /// patient record.
    pub patient_id: Option<Uuid>,
    pub name: String,
    pub phone: String,
    pub service: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub is_read: bool,
    /// Set when a post-confirmation side effect (patient upsert, ledger
    /// seeding) failed and an operator needs to reconcile by hand.
    pub needs_reconciliation: bool,
    /// Set when every delivery attempt for this appointment's messages was
    /// exhausted.
    pub delivery_failed: bool,
    /// For a rescheduled record, the replacement appointment.
    pub rescheduled_to: Option<Uuid>,
    pub history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAppointmentRequest {
    pub name: String,
    pub phone: String,
    pub service: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcceptAppointmentRequest {
    /// Amount billed for the visit, seeded into the patient's ledger on
    /// first confirmation.
    pub billable: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Billable amount when a pending request is confirmed through a direct
    /// reschedule, same as on accept.
    #[serde(default)]
    pub billable: Option<Decimal>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Invalid appointment: {0}")]
    Validation(String),

    #[error("The requested slot is not available")]
    SlotUnavailable,

    #[error("Appointment not found")]
    NotFound,

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}
