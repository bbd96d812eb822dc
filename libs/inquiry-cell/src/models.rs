// libs/inquiry-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A contact-form message from the public site. Unread inquiries feed the
/// dashboard badge the same way unread appointments do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitInquiryRequest {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InquiryError {
    #[error("Inquiry not found")]
    NotFound,

    #[error("Invalid inquiry: {0}")]
    Validation(String),
}
