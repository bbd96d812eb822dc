// libs/appointment-cell/src/store.rs
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, StatusChange};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Slot is already taken")]
    SlotTaken,

    #[error("Appointment not found")]
    NotFound,

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
}

/// Appointment persistence. Every mutation that touches slot ownership runs
/// under a single writer section, so two requests for the same (date, time)
/// can never both succeed.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Insert a freshly submitted pending appointment, claiming its slot.
    async fn insert_pending(&self, appointment: Appointment) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Appointment, StoreError>;

    /// Newest first.
    async fn list(&self) -> Vec<Appointment>;

    /// Times on `date` held by a pending or confirmed appointment.
    async fn taken_slots(&self, date: NaiveDate) -> HashSet<NaiveTime>;

    /// Apply a status transition, enforcing the allowed edges and slot
    /// ownership. `Rejected -> Confirmed` re-claims the slot and fails with
    /// `SlotTaken` if someone else took it in the meantime.
    async fn transition(
        &self,
        id: Uuid,
        to: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError>;

    /// Close the confirmed appointment as `Rescheduled` and insert a new
    /// confirmed record at the new slot, atomically. Returns
    /// (closed original, new record).
    async fn reschedule(
        &self,
        id: Uuid,
        new_date: NaiveDate,
        new_time: NaiveTime,
        now: DateTime<Utc>,
    ) -> Result<(Appointment, Appointment), StoreError>;

    /// Remove the record entirely, freeing its slot if held. Returns the
    /// removed appointment.
    async fn delete(&self, id: Uuid) -> Result<Appointment, StoreError>;

    async fn set_patient(
        &self,
        id: Uuid,
        patient_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError>;

    async fn mark_read(&self, id: Uuid, now: DateTime<Utc>) -> Result<Appointment, StoreError>;

    async fn flag_reconciliation(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError>;

    async fn flag_delivery_failed(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError>;
}

fn transition_allowed(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    matches!(
        (from, to),
        (AppointmentStatus::Pending, AppointmentStatus::Confirmed)
            | (AppointmentStatus::Pending, AppointmentStatus::Rejected)
            | (AppointmentStatus::Confirmed, AppointmentStatus::Rejected)
            | (AppointmentStatus::Rejected, AppointmentStatus::Confirmed)
    )
}

#[derive(Default)]
struct Inner {
    rows: HashMap<Uuid, Appointment>,
    slots: HashMap<(NaiveDate, NaiveTime), Uuid>,
}

#[derive(Default)]
pub struct MemoryAppointmentStore {
    inner: RwLock<Inner>,
}

impl MemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentStore for MemoryAppointmentStore {
    async fn insert_pending(&self, appointment: Appointment) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let key = (appointment.date, appointment.time);
        if inner.slots.contains_key(&key) {
            return Err(StoreError::SlotTaken);
        }
        inner.slots.insert(key, appointment.id);
        inner.rows.insert(appointment.id, appointment);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Appointment, StoreError> {
        let inner = self.inner.read().await;
        inner.rows.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list(&self) -> Vec<Appointment> {
        let inner = self.inner.read().await;
        let mut all: Vec<Appointment> = inner.rows.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    async fn taken_slots(&self, date: NaiveDate) -> HashSet<NaiveTime> {
        let inner = self.inner.read().await;
        inner
            .slots
            .keys()
            .filter(|(d, _)| *d == date)
            .map(|(_, t)| *t)
            .collect()
    }

    async fn transition(
        &self,
        id: Uuid,
        to: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        let mut inner = self.inner.write().await;

        let (from, key) = {
            let row = inner.rows.get(&id).ok_or(StoreError::NotFound)?;
            (row.status, (row.date, row.time))
        };
        if !transition_allowed(from, to) {
            return Err(StoreError::InvalidTransition { from, to });
        }

        // A rejected record gave up its slot; confirming it again has to
        // win the slot back first.
        if !from.holds_slot() && to.holds_slot() {
            match inner.slots.get(&key) {
                Some(holder) if *holder != id => return Err(StoreError::SlotTaken),
                _ => {
                    inner.slots.insert(key, id);
                }
            }
        }
        if from.holds_slot() && !to.holds_slot() {
            if inner.slots.get(&key) == Some(&id) {
                inner.slots.remove(&key);
            }
        }

        let row = inner.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        row.history.push(StatusChange {
            from: Some(from),
            to,
            at: now,
        });
        row.status = to;
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn reschedule(
        &self,
        id: Uuid,
        new_date: NaiveDate,
        new_time: NaiveTime,
        now: DateTime<Utc>,
    ) -> Result<(Appointment, Appointment), StoreError> {
        let mut inner = self.inner.write().await;

        let original = inner.rows.get(&id).cloned().ok_or(StoreError::NotFound)?;
        // Pending and confirmed records can both be moved; a rejected or
        // already-rescheduled record no longer owns a slot to move.
        if !original.status.holds_slot() {
            return Err(StoreError::InvalidTransition {
                from: original.status,
                to: AppointmentStatus::Rescheduled,
            });
        }

        let old_key = (original.date, original.time);
        let new_key = (new_date, new_time);
        // The original's own slot is about to be freed, so moving back into
        // it is allowed; any other holder blocks the move.
        match inner.slots.get(&new_key) {
            Some(holder) if *holder != id => return Err(StoreError::SlotTaken),
            _ => {}
        }

        if inner.slots.get(&old_key) == Some(&id) {
            inner.slots.remove(&old_key);
        }

        let replacement = Appointment {
            id: Uuid::new_v4(),
            patient_id: original.patient_id,
            name: original.name.clone(),
            phone: original.phone.clone(),
            service: original.service.clone(),
            date: new_date,
            time: new_time,
            status: AppointmentStatus::Confirmed,
            is_read: true,
            needs_reconciliation: false,
            delivery_failed: false,
            rescheduled_to: None,
            history: vec![StatusChange {
                from: None,
                to: AppointmentStatus::Confirmed,
                at: now,
            }],
            created_at: now,
            updated_at: now,
        };
        inner.slots.insert(new_key, replacement.id);
        inner.rows.insert(replacement.id, replacement.clone());

        let row = inner.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        row.history.push(StatusChange {
            from: Some(original.status),
            to: AppointmentStatus::Rescheduled,
            at: now,
        });
        row.status = AppointmentStatus::Rescheduled;
        row.rescheduled_to = Some(replacement.id);
        row.updated_at = now;
        let closed = row.clone();

        Ok((closed, replacement))
    }

    async fn delete(&self, id: Uuid) -> Result<Appointment, StoreError> {
        let mut inner = self.inner.write().await;
        let removed = inner.rows.remove(&id).ok_or(StoreError::NotFound)?;
        let key = (removed.date, removed.time);
        if inner.slots.get(&key) == Some(&id) {
            inner.slots.remove(&key);
        }
        Ok(removed)
    }

    async fn set_patient(
        &self,
        id: Uuid,
        patient_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        self.update(id, now, |row| row.patient_id = Some(patient_id))
            .await
    }

    async fn mark_read(&self, id: Uuid, now: DateTime<Utc>) -> Result<Appointment, StoreError> {
        self.update(id, now, |row| row.is_read = true).await
    }

    async fn flag_reconciliation(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        self.update(id, now, |row| row.needs_reconciliation = true)
            .await
    }

    async fn flag_delivery_failed(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        self.update(id, now, |row| row.delivery_failed = true).await
    }
}

impl MemoryAppointmentStore {
    async fn update<F>(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        mutate: F,
    ) -> Result<Appointment, StoreError>
    where
        F: FnOnce(&mut Appointment),
    {
        let mut inner = self.inner.write().await;
        let row = inner.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        mutate(row);
        row.updated_at = now;
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(date: NaiveDate, time: NaiveTime) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: Uuid::new_v4(),
            patient_id: None,
            name: "Asha".to_string(),
            phone: "9999999999".to_string(),
            service: "Teeth Cleaning".to_string(),
            date,
            time,
            status: AppointmentStatus::Pending,
            is_read: false,
            needs_reconciliation: false,
            delivery_failed: false,
            rescheduled_to: None,
            history: vec![StatusChange {
                from: None,
                to: AppointmentStatus::Pending,
                at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    fn slot() -> (NaiveDate, NaiveTime) {
        (
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn second_insert_for_same_slot_fails() {
        let store = MemoryAppointmentStore::new();
        let (date, time) = slot();
        store.insert_pending(pending(date, time)).await.unwrap();
        let err = store.insert_pending(pending(date, time)).await.unwrap_err();
        assert!(matches!(err, StoreError::SlotTaken));
    }

    #[tokio::test]
    async fn rejection_frees_the_slot_for_a_new_request() {
        let store = MemoryAppointmentStore::new();
        let (date, time) = slot();
        let first = pending(date, time);
        let first_id = first.id;
        store.insert_pending(first).await.unwrap();
        store
            .transition(first_id, AppointmentStatus::Rejected, Utc::now())
            .await
            .unwrap();

        store.insert_pending(pending(date, time)).await.unwrap();
        assert_eq!(store.taken_slots(date).await.len(), 1);
    }

    #[tokio::test]
    async fn rejected_record_cannot_be_reconfirmed_once_slot_is_retaken() {
        let store = MemoryAppointmentStore::new();
        let (date, time) = slot();
        let first = pending(date, time);
        let first_id = first.id;
        store.insert_pending(first).await.unwrap();
        store
            .transition(first_id, AppointmentStatus::Rejected, Utc::now())
            .await
            .unwrap();
        store.insert_pending(pending(date, time)).await.unwrap();

        let err = store
            .transition(first_id, AppointmentStatus::Confirmed, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SlotTaken));
    }

    #[tokio::test]
    async fn reschedule_closes_original_and_creates_confirmed_replacement() {
        let store = MemoryAppointmentStore::new();
        let (date, time) = slot();
        let original = pending(date, time);
        let original_id = original.id;
        store.insert_pending(original).await.unwrap();
        store
            .transition(original_id, AppointmentStatus::Confirmed, Utc::now())
            .await
            .unwrap();

        let new_time = NaiveTime::from_hms_opt(16, 30, 0).unwrap();
        let (closed, replacement) = store
            .reschedule(original_id, date, new_time, Utc::now())
            .await
            .unwrap();

        assert_eq!(closed.status, AppointmentStatus::Rescheduled);
        assert_eq!(closed.rescheduled_to, Some(replacement.id));
        assert_eq!(replacement.status, AppointmentStatus::Confirmed);
        assert_eq!(replacement.time, new_time);

        // Old slot is free again, new slot is held.
        let taken = store.taken_slots(date).await;
        assert!(!taken.contains(&time));
        assert!(taken.contains(&new_time));
    }

    #[tokio::test]
    async fn rejecting_a_confirmed_appointment_frees_its_slot() {
        let store = MemoryAppointmentStore::new();
        let (date, time) = slot();
        let row = pending(date, time);
        let id = row.id;
        store.insert_pending(row).await.unwrap();
        store
            .transition(id, AppointmentStatus::Confirmed, Utc::now())
            .await
            .unwrap();

        let rejected = store
            .transition(id, AppointmentStatus::Rejected, Utc::now())
            .await
            .unwrap();
        assert_eq!(rejected.status, AppointmentStatus::Rejected);
        assert!(store.taken_slots(date).await.is_empty());
    }

    #[tokio::test]
    async fn pending_request_can_be_rescheduled_directly() {
        let store = MemoryAppointmentStore::new();
        let (date, time) = slot();
        let row = pending(date, time);
        let id = row.id;
        store.insert_pending(row).await.unwrap();

        let new_time = NaiveTime::from_hms_opt(11, 0, 0).unwrap();
        let (closed, replacement) = store
            .reschedule(id, date, new_time, Utc::now())
            .await
            .unwrap();
        assert_eq!(closed.status, AppointmentStatus::Rescheduled);
        assert_eq!(closed.history.last().unwrap().from, Some(AppointmentStatus::Pending));
        assert_eq!(replacement.status, AppointmentStatus::Confirmed);

        let taken = store.taken_slots(date).await;
        assert!(!taken.contains(&time));
        assert!(taken.contains(&new_time));
    }

    #[tokio::test]
    async fn reschedule_of_rejected_record_is_refused() {
        let store = MemoryAppointmentStore::new();
        let (date, time) = slot();
        let row = pending(date, time);
        let id = row.id;
        store.insert_pending(row).await.unwrap();
        store
            .transition(id, AppointmentStatus::Rejected, Utc::now())
            .await
            .unwrap();

        let err = store
            .reschedule(id, date, NaiveTime::from_hms_opt(11, 0, 0).unwrap(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn delete_frees_slot_and_removes_record() {
        let store = MemoryAppointmentStore::new();
        let (date, time) = slot();
        let row = pending(date, time);
        let id = row.id;
        store.insert_pending(row).await.unwrap();

        store.delete(id).await.unwrap();
        assert!(store.taken_slots(date).await.is_empty());
        assert!(matches!(store.get(id).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn history_records_every_transition() {
        let store = MemoryAppointmentStore::new();
        let (date, time) = slot();
        let row = pending(date, time);
        let id = row.id;
        store.insert_pending(row).await.unwrap();

        store
            .transition(id, AppointmentStatus::Rejected, Utc::now())
            .await
            .unwrap();
        let after = store
            .transition(id, AppointmentStatus::Confirmed, Utc::now())
            .await
            .unwrap();

        let statuses: Vec<AppointmentStatus> = after.history.iter().map(|h| h.to).collect();
        assert_eq!(
            statuses,
            vec![
                AppointmentStatus::Pending,
                AppointmentStatus::Rejected,
                AppointmentStatus::Confirmed,
            ]
        );
    }
}
