// libs/patient-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub chief_complaint: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub registration_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Defaults supplied by the confirming appointment when a patient record is
/// created as a booking side effect. Applied only on creation; an existing
/// patient's fields are never merged from appointment data.
#[derive(Debug, Clone, Default)]
pub struct PatientDefaults {
    pub chief_complaint: Option<String>,
    pub registration_date: Option<NaiveDate>,
}

/// Explicit clinical-record edit, distinct from the booking side effect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub chief_complaint: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Patient identity for dedup: trimmed name (case-insensitive) + trimmed phone.
pub fn identity_key(name: &str, phone: &str) -> (String, String) {
    (name.trim().to_lowercase(), phone.trim().to_string())
}
