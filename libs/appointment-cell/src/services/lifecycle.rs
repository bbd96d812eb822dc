// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use notification_cell::{DeliveryFailureSink, NotificationDispatcher, NotificationEvent};
use patient_cell::models::PatientDefaults;
use patient_cell::PatientRegistry;
use payment_cell::models::PaymentMethod;
use payment_cell::PaymentLedgerService;
use realtime_cell::{ChangeEvent, EntityKind, RealtimeBroadcaster};
use scheduling_cell::{available_slots, CalendarPolicy, Clock};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, StatusChange, SubmitAppointmentRequest,
};
use crate::store::{AppointmentStore, StoreError};

impl From<StoreError> for AppointmentError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::SlotTaken => AppointmentError::SlotUnavailable,
            StoreError::NotFound => AppointmentError::NotFound,
            StoreError::InvalidTransition { from, to } => {
                AppointmentError::InvalidTransition { from, to }
            }
        }
    }
}

/// Drives an appointment through its states and fires the side effects
/// each transition owns: patient registration and ledger seeding on
/// confirmation, outbound messages, realtime broadcast.
///
/// The slot claim itself is atomic inside the store; side effects run after
/// the transition committed and are deliberately non-fatal. A failed side
/// effect marks the appointment for reconciliation instead of rolling the
/// transition back.
pub struct AppointmentLifecycleService {
    store: Arc<dyn AppointmentStore>,
    registry: Arc<PatientRegistry>,
    ledger: Arc<PaymentLedgerService>,
    dispatcher: Arc<NotificationDispatcher>,
    broadcaster: Arc<RealtimeBroadcaster>,
    clock: Arc<dyn Clock>,
    policy: CalendarPolicy,
}

impl AppointmentLifecycleService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        registry: Arc<PatientRegistry>,
        ledger: Arc<PaymentLedgerService>,
        dispatcher: Arc<NotificationDispatcher>,
        broadcaster: Arc<RealtimeBroadcaster>,
        clock: Arc<dyn Clock>,
        policy: CalendarPolicy,
    ) -> Self {
        Self {
            store,
            registry,
            ledger,
            dispatcher,
            broadcaster,
            clock,
            policy,
        }
    }

    pub async fn available(&self, date: NaiveDate) -> Vec<NaiveTime> {
        let taken = self.store.taken_slots(date).await;
        available_slots(&self.policy, date, &taken, self.clock.now())
    }

    /// Public booking request. The slot must be open at commit time; two
    /// concurrent submissions for the same slot resolve to exactly one
    /// pending appointment.
    pub async fn submit(
        &self,
        request: SubmitAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let name = request.name.trim().to_string();
        let phone = request.phone.trim().to_string();
        let service = request.service.trim().to_string();
        if name.is_empty() || phone.is_empty() {
            return Err(AppointmentError::Validation(
                "Name and phone are required".to_string(),
            ));
        }
        if service.is_empty() {
            return Err(AppointmentError::Validation(
                "Service is required".to_string(),
            ));
        }

        self.check_slot_open(request.date, request.time).await?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: None,
            name,
            phone,
            service,
            date: request.date,
            time: request.time,
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
        };

        self.store.insert_pending(appointment.clone()).await?;
        info!(
            "New appointment request {} for {} at {}",
            appointment.id, appointment.date, appointment.time
        );
        self.publish(&appointment);
        Ok(appointment)
    }

    /// Confirm a pending (or previously rejected) request. Registers the
    /// patient if this identity is new, seeds the ledger with the billable
    /// amount on first confirmation, and messages both sides.
    pub async fn accept(
        &self,
        id: Uuid,
        billable: Option<Decimal>,
    ) -> Result<Appointment, AppointmentError> {
        let now = Utc::now();
        let mut appointment = self
            .store
            .transition(id, AppointmentStatus::Confirmed, now)
            .await?;

        match self.run_confirmation_effects(&appointment, billable).await {
            Ok(Some(updated)) => appointment = updated,
            Ok(None) => {}
            Err(e) => {
                warn!(
                    "Post-confirmation effects failed for {}: {}; flagged for reconciliation",
                    id, e
                );
                appointment = self.store.flag_reconciliation(id, Utc::now()).await?;
            }
        }

        self.dispatcher.dispatch(NotificationEvent::Confirmed {
            appointment_id: appointment.id,
            name: appointment.name.clone(),
            phone: appointment.phone.clone(),
            service: appointment.service.clone(),
            date: appointment.date,
            time: appointment.time,
        });
        self.publish(&appointment);
        Ok(appointment)
    }

    pub async fn reject(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .store
            .transition(id, AppointmentStatus::Rejected, Utc::now())
            .await?;

        self.dispatcher.dispatch(NotificationEvent::Rejected {
            appointment_id: appointment.id,
            name: appointment.name.clone(),
            phone: appointment.phone.clone(),
            service: appointment.service.clone(),
            date: appointment.date,
        });
        self.publish(&appointment);
        Ok(appointment)
    }

    /// Move a pending or confirmed appointment to a new slot. The original
    /// record is closed as rescheduled and a fresh confirmed record takes
    /// the new slot, both in one store operation. The replacement is a
    /// confirmation, so it carries the same patient and ledger side effects
    /// as accept.
    pub async fn reschedule(
        &self,
        id: Uuid,
        new_date: NaiveDate,
        new_time: NaiveTime,
        billable: Option<Decimal>,
    ) -> Result<Appointment, AppointmentError> {
        self.check_slot_in_policy(new_date, new_time)?;

        let (closed, mut replacement) = self
            .store
            .reschedule(id, new_date, new_time, Utc::now())
            .await?;

        match self.run_confirmation_effects(&replacement, billable).await {
            Ok(Some(updated)) => replacement = updated,
            Ok(None) => {}
            Err(e) => {
                warn!(
                    "Post-reschedule effects failed for {}: {}; flagged for reconciliation",
                    replacement.id, e
                );
                replacement = self
                    .store
                    .flag_reconciliation(replacement.id, Utc::now())
                    .await?;
            }
        }

        self.dispatcher.dispatch(NotificationEvent::Rescheduled {
            appointment_id: replacement.id,
            name: replacement.name.clone(),
            phone: replacement.phone.clone(),
            service: replacement.service.clone(),
            old_date: closed.date,
            old_time: closed.time,
            new_date: replacement.date,
            new_time: replacement.time,
        });
        self.publish(&closed);
        self.publish(&replacement);
        Ok(replacement)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppointmentError> {
        let removed = self.store.delete(id).await?;
        info!("Appointment {} deleted", removed.id);
        self.broadcaster.publish(ChangeEvent::deleted(
            EntityKind::Appointment,
            removed.id,
            Utc::now(),
        ));
        Ok(())
    }

    pub async fn mark_read(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.store.mark_read(id, Utc::now()).await?;
        self.publish(&appointment);
        Ok(appointment)
    }

    pub async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn list(&self) -> Vec<Appointment> {
        self.store.list().await
    }

    /// Patient upsert plus first-time ledger seeding. Returns the refreshed
    /// appointment when the patient link changed.
    async fn run_confirmation_effects(
        &self,
        appointment: &Appointment,
        billable: Option<Decimal>,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let (patient, created) = self
            .registry
            .upsert_by_identity(
                &appointment.name,
                &appointment.phone,
                PatientDefaults {
                    chief_complaint: Some(appointment.service.clone()),
                    registration_date: None,
                },
                Utc::now(),
            )
            .await
            .map_err(|e| AppointmentError::Storage(e.to_string()))?;
        if created {
            info!(
                "Patient {} registered from appointment {}",
                patient.id, appointment.id
            );
        }

        let updated = self
            .store
            .set_patient(appointment.id, patient.id, Utc::now())
            .await?;

        if let Some(amount) = billable {
            // Seed the ledger only once per patient; re-confirmation after a
            // rejection must not double-bill.
            if self.ledger.has_entries(patient.id).await {
                warn!(
                    "Patient {} already has ledger entries, billable amount ignored",
                    patient.id
                );
            } else {
                self.ledger
                    .record_entry(
                        patient.id,
                        amount,
                        Decimal::ZERO,
                        PaymentMethod::Other,
                        Some(format!("Billed for {}", appointment.service)),
                        Utc::now(),
                    )
                    .await
                    .map_err(|e| AppointmentError::Storage(e.to_string()))?;
            }
        }

        Ok(Some(updated))
    }

    async fn check_slot_open(
        &self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<(), AppointmentError> {
        self.check_slot_in_policy(date, time)?;
        if !self.available(date).await.contains(&time) {
            return Err(AppointmentError::SlotUnavailable);
        }
        Ok(())
    }

    /// A time outside clinic hours is unavailable, not malformed: the
    /// request parses fine, there is just nothing to book there.
    fn check_slot_in_policy(&self, date: NaiveDate, time: NaiveTime) -> Result<(), AppointmentError> {
        use chrono::Datelike;
        if !self.policy.is_valid_slot(date.weekday(), time) {
            return Err(AppointmentError::SlotUnavailable);
        }
        Ok(())
    }

    fn publish(&self, appointment: &Appointment) {
        match serde_json::to_value(appointment) {
            Ok(payload) => self.broadcaster.publish(ChangeEvent::new(
                EntityKind::Appointment,
                appointment.id,
                appointment.updated_at,
                payload,
            )),
            Err(e) => warn!(
                "Failed to serialize appointment {} for broadcast: {}",
                appointment.id, e
            ),
        }
    }
}

/// Lets the notification worker stamp `delivery_failed` on the appointment
/// when a message exhausts its retries.
pub struct StoreFailureSink {
    store: Arc<dyn AppointmentStore>,
    broadcaster: Arc<RealtimeBroadcaster>,
}

impl StoreFailureSink {
    pub fn new(store: Arc<dyn AppointmentStore>, broadcaster: Arc<RealtimeBroadcaster>) -> Self {
        Self { store, broadcaster }
    }
}

#[async_trait]
impl DeliveryFailureSink for StoreFailureSink {
    async fn delivery_failed(&self, appointment_id: Uuid) {
        match self.store.flag_delivery_failed(appointment_id, Utc::now()).await {
            Ok(appointment) => match serde_json::to_value(&appointment) {
                Ok(payload) => self.broadcaster.publish(ChangeEvent::new(
                    EntityKind::Appointment,
                    appointment.id,
                    appointment.updated_at,
                    payload,
                )),
                Err(e) => warn!("Failed to serialize appointment {}: {}", appointment_id, e),
            },
            // The appointment may have been deleted while the message was
            // still in the queue.
            Err(e) => warn!(
                "Could not flag delivery failure on appointment {}: {}",
                appointment_id, e
            ),
        }
    }
}
