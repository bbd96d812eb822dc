// libs/patient-cell/src/services/registry.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use realtime_cell::{ChangeEvent, EntityKind, RealtimeBroadcaster};

use crate::models::{identity_key, Patient, PatientDefaults, PatientError, UpdatePatientRequest};

/// Patient records keyed by identity (name, phone). A patient is created at
/// most once per distinct identity, as a side effect of the first confirmed
/// appointment; later confirmations for the same identity return the
/// existing record untouched.
pub struct PatientRegistry {
    inner: RwLock<Inner>,
    broadcaster: Arc<RealtimeBroadcaster>,
}

#[derive(Default)]
struct Inner {
    patients: HashMap<Uuid, Patient>,
    by_identity: HashMap<(String, String), Uuid>,
}

impl PatientRegistry {
    pub fn new(broadcaster: Arc<RealtimeBroadcaster>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            broadcaster,
        }
    }

    /// Return the patient matching (name, phone) case-insensitively trimmed,
    /// creating one from `defaults` if absent. The boolean reports whether a
    /// record was created. Existing clinical fields are never overwritten
    /// here - those change only through `update_patient`.
    pub async fn upsert_by_identity(
        &self,
        name: &str,
        phone: &str,
        defaults: PatientDefaults,
        now: DateTime<Utc>,
    ) -> Result<(Patient, bool), PatientError> {
        let trimmed_name = name.trim();
        let trimmed_phone = phone.trim();
        if trimmed_name.is_empty() || trimmed_phone.is_empty() {
            return Err(PatientError::Validation(
                "Patient name and phone are required".to_string(),
            ));
        }

        let key = identity_key(trimmed_name, trimmed_phone);
        let mut inner = self.inner.write().await;

        if let Some(id) = inner.by_identity.get(&key) {
            let existing = inner
                .patients
                .get(id)
                .cloned()
                .ok_or(PatientError::NotFound)?;
            debug!("Patient {} already registered for this identity", existing.id);
            return Ok((existing, false));
        }

        let patient = Patient {
            id: Uuid::new_v4(),
            name: trimmed_name.to_string(),
            phone: trimmed_phone.to_string(),
            age: None,
            gender: None,
            address: None,
            chief_complaint: defaults.chief_complaint,
            medical_history: None,
            allergies: None,
            registration_date: defaults
                .registration_date
                .unwrap_or_else(|| now.date_naive()),
            created_at: now,
            updated_at: now,
        };

        inner.by_identity.insert(key, patient.id);
        inner.patients.insert(patient.id, patient.clone());
        drop(inner);

        info!("Registered new patient {} ({})", patient.id, patient.name);
        self.publish(&patient);
        Ok((patient, true))
    }

    /// Explicit clinical-record edit.
    pub async fn update_patient(
        &self,
        id: Uuid,
        request: UpdatePatientRequest,
        now: DateTime<Utc>,
    ) -> Result<Patient, PatientError> {
        let mut inner = self.inner.write().await;

        let old_key = {
            let patient = inner.patients.get(&id).ok_or(PatientError::NotFound)?;
            identity_key(&patient.name, &patient.phone)
        };

        let patient = inner.patients.get_mut(&id).ok_or(PatientError::NotFound)?;
        if let Some(name) = request.name {
            patient.name = name.trim().to_string();
        }
        if let Some(phone) = request.phone {
            patient.phone = phone.trim().to_string();
        }
        if let Some(age) = request.age {
            patient.age = Some(age);
        }
        if let Some(gender) = request.gender {
            patient.gender = Some(gender);
        }
        if let Some(address) = request.address {
            patient.address = Some(address);
        }
        if let Some(chief_complaint) = request.chief_complaint {
            patient.chief_complaint = Some(chief_complaint);
        }
        if let Some(medical_history) = request.medical_history {
            patient.medical_history = Some(medical_history);
        }
        if let Some(allergies) = request.allergies {
            patient.allergies = Some(allergies);
        }
        patient.updated_at = now;
        let updated = patient.clone();

        let new_key = identity_key(&updated.name, &updated.phone);
        if new_key != old_key {
            inner.by_identity.remove(&old_key);
            inner.by_identity.insert(new_key, id);
        }
        drop(inner);

        debug!("Patient {} updated", id);
        self.publish(&updated);
        Ok(updated)
    }

    pub async fn get(&self, id: Uuid) -> Result<Patient, PatientError> {
        let inner = self.inner.read().await;
        inner.patients.get(&id).cloned().ok_or(PatientError::NotFound)
    }

    pub async fn find_by_identity(&self, name: &str, phone: &str) -> Option<Patient> {
        let inner = self.inner.read().await;
        let id = inner.by_identity.get(&identity_key(name, phone))?;
        inner.patients.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Patient> {
        let inner = self.inner.read().await;
        let mut patients: Vec<Patient> = inner.patients.values().cloned().collect();
        patients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        patients
    }

    fn publish(&self, patient: &Patient) {
        match serde_json::to_value(patient) {
            Ok(payload) => self.broadcaster.publish(ChangeEvent::new(
                EntityKind::Patient,
                patient.id,
                patient.updated_at,
                payload,
            )),
            Err(e) => tracing::warn!("Failed to serialize patient for broadcast: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PatientRegistry {
        PatientRegistry::new(Arc::new(RealtimeBroadcaster::new()))
    }

    #[tokio::test]
    async fn identity_match_is_case_insensitive_and_trimmed() {
        let registry = registry();
        let now = Utc::now();

        let (first, created) = registry
            .upsert_by_identity("Asha Patel", "9999999999", PatientDefaults::default(), now)
            .await
            .unwrap();
        assert!(created);

        let (second, created) = registry
            .upsert_by_identity("  asha patel ", " 9999999999", PatientDefaults::default(), now)
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);

        assert_eq!(registry.list().await.len(), 1);
    }

    #[tokio::test]
    async fn upsert_never_overwrites_clinical_fields() {
        let registry = registry();
        let now = Utc::now();

        let (patient, _) = registry
            .upsert_by_identity(
                "Ravi",
                "8888888888",
                PatientDefaults {
                    chief_complaint: Some("Teeth Cleaning".to_string()),
                    registration_date: None,
                },
                now,
            )
            .await
            .unwrap();

        registry
            .update_patient(
                patient.id,
                UpdatePatientRequest {
                    medical_history: Some("Diabetic".to_string()),
                    allergies: Some("Penicillin".to_string()),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();

        // A later confirmed appointment for the same identity must not touch
        // the clinical record.
        let (after, created) = registry
            .upsert_by_identity(
                "Ravi",
                "8888888888",
                PatientDefaults {
                    chief_complaint: Some("Root Canal Treatment".to_string()),
                    registration_date: None,
                },
                now,
            )
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(after.medical_history.as_deref(), Some("Diabetic"));
        assert_eq!(after.allergies.as_deref(), Some("Penicillin"));
        assert_eq!(after.chief_complaint.as_deref(), Some("Teeth Cleaning"));
    }

    #[tokio::test]
    async fn blank_identity_is_rejected() {
        let registry = registry();
        let result = registry
            .upsert_by_identity("  ", "123", PatientDefaults::default(), Utc::now())
            .await;
        assert!(matches!(result, Err(PatientError::Validation(_))));
    }
}
