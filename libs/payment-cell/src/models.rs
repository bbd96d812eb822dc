// libs/payment-cell/src/models.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub amount_total: Decimal,
    pub amount_paid: Decimal,
    pub method: PaymentMethod,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    Other,
}

/// Billing state derived from the per-patient sums. Never stored; any
/// displayed status is recomputed from the entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Partial,
    Unpaid,
    NoDues,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Partial => write!(f, "partial"),
            PaymentStatus::Unpaid => write!(f, "unpaid"),
            PaymentStatus::NoDues => write!(f, "no_dues"),
        }
    }
}

/// Pure derivation: paid >= total > 0 is paid, 0 < paid < total is partial,
/// paid = 0 with total > 0 is unpaid, total = 0 is no dues.
pub fn derive_status(total: Decimal, paid: Decimal) -> PaymentStatus {
    if total.is_zero() {
        PaymentStatus::NoDues
    } else if paid >= total {
        PaymentStatus::Paid
    } else if paid > Decimal::ZERO {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Unpaid
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordPaymentRequest {
    pub patient_id: Uuid,
    pub amount_total: Decimal,
    pub amount_paid: Decimal,
    pub method: PaymentMethod,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientLedger {
    pub patient_id: Uuid,
    pub entries: Vec<LedgerEntry>,
    pub total_billed: Decimal,
    pub total_paid: Decimal,
    pub balance: Decimal,
    pub status: PaymentStatus,
}

/// Payments dashboard totals.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSummary {
    pub total_billed: Decimal,
    pub total_collected: Decimal,
    pub total_outstanding: Decimal,
    pub collected_today: Decimal,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("No ledger for patient")]
    PatientNotFound,

    #[error("Validation error: {0}")]
    Validation(String),
}
