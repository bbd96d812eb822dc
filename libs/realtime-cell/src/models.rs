// libs/realtime-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Appointment,
    Patient,
    LedgerEntry,
    Inquiry,
}

/// One committed mutation, fanned out to every subscribed admin session.
/// Delivery is at-least-once; consumers merge by (entity, entity_id) with
/// last-write-wins on `updated_at`, so redelivery is harmless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub entity: EntityKind,
    pub entity_id: Uuid,
    pub updated_at: DateTime<Utc>,
    pub payload: Value,
}

impl ChangeEvent {
    pub fn new(entity: EntityKind, entity_id: Uuid, updated_at: DateTime<Utc>, payload: Value) -> Self {
        Self {
            entity,
            entity_id,
            updated_at,
            payload,
        }
    }

    /// Tombstone published when a record is permanently removed.
    pub fn deleted(entity: EntityKind, entity_id: Uuid, updated_at: DateTime<Utc>) -> Self {
        Self {
            entity,
            entity_id,
            updated_at,
            payload: serde_json::json!({ "deleted": true }),
        }
    }

    pub fn is_deletion(&self) -> bool {
        self.payload
            .get("deleted")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
