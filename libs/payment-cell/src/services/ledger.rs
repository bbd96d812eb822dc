// libs/payment-cell/src/services/ledger.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use realtime_cell::{ChangeEvent, EntityKind, RealtimeBroadcaster};
use scheduling_cell::Clock;

use crate::models::{
    derive_status, LedgerEntry, LedgerError, LedgerSummary, PatientLedger, PaymentMethod,
    PaymentStatus,
};

/// Append-only billing ledger. Balance and status are computed from the
/// entries on every read; amounts are exact decimals so thousands of small
/// entries accumulate without drift.
pub struct PaymentLedgerService {
    entries: RwLock<HashMap<Uuid, Vec<LedgerEntry>>>,
    broadcaster: Arc<RealtimeBroadcaster>,
    clock: Arc<dyn Clock>,
}

impl PaymentLedgerService {
    pub fn new(broadcaster: Arc<RealtimeBroadcaster>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            broadcaster,
            clock,
        }
    }

    /// Append an entry. Prior entries are never mutated; corrections are new
    /// entries (e.g. total 0 / paid N settles an outstanding balance).
    pub async fn record_entry(
        &self,
        patient_id: Uuid,
        amount_total: Decimal,
        amount_paid: Decimal,
        method: PaymentMethod,
        note: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        if amount_total < Decimal::ZERO || amount_paid < Decimal::ZERO {
            return Err(LedgerError::Validation(
                "Amounts cannot be negative".to_string(),
            ));
        }

        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            patient_id,
            amount_total,
            amount_paid,
            method,
            note,
            occurred_at,
            created_at: occurred_at,
            updated_at: occurred_at,
        };

        {
            let mut entries = self.entries.write().await;
            entries.entry(patient_id).or_default().push(entry.clone());
        }

        info!(
            "Ledger entry {} for patient {}: billed {} / paid {}",
            entry.id, patient_id, amount_total, amount_paid
        );
        self.publish(&entry);
        Ok(entry)
    }

    pub async fn entries(&self, patient_id: Uuid) -> Vec<LedgerEntry> {
        let entries = self.entries.read().await;
        entries.get(&patient_id).cloned().unwrap_or_default()
    }

    pub async fn has_entries(&self, patient_id: Uuid) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(&patient_id)
            .map(|rows| !rows.is_empty())
            .unwrap_or(false)
    }

    /// Outstanding balance: sum of billed minus sum of paid.
    pub async fn balance(&self, patient_id: Uuid) -> Decimal {
        let (total, paid) = self.sums(patient_id).await;
        total - paid
    }

    pub async fn status(&self, patient_id: Uuid) -> PaymentStatus {
        let (total, paid) = self.sums(patient_id).await;
        derive_status(total, paid)
    }

    pub async fn patient_ledger(&self, patient_id: Uuid) -> Result<PatientLedger, LedgerError> {
        let rows = {
            let entries = self.entries.read().await;
            entries
                .get(&patient_id)
                .cloned()
                .ok_or(LedgerError::PatientNotFound)?
        };

        let total_billed: Decimal = rows.iter().map(|e| e.amount_total).sum();
        let total_paid: Decimal = rows.iter().map(|e| e.amount_paid).sum();
        debug!("Ledger for {}: {} entries", patient_id, rows.len());

        Ok(PatientLedger {
            patient_id,
            total_billed,
            total_paid,
            balance: total_billed - total_paid,
            status: derive_status(total_billed, total_paid),
            entries: rows,
        })
    }

    /// Dashboard totals across all patients. "Today" is the clinic's local
    /// day, so an entry recorded just after local midnight counts even
    /// while it is still yesterday in UTC.
    pub async fn summary(&self) -> LedgerSummary {
        let now_local = self.clock.now();
        let today: NaiveDate = now_local.date_naive();
        let offset = *now_local.offset();

        let entries = self.entries.read().await;
        let mut total_billed = Decimal::ZERO;
        let mut total_collected = Decimal::ZERO;
        let mut collected_today = Decimal::ZERO;

        for rows in entries.values() {
            for entry in rows {
                total_billed += entry.amount_total;
                total_collected += entry.amount_paid;
                if entry.occurred_at.with_timezone(&offset).date_naive() == today {
                    collected_today += entry.amount_paid;
                }
            }
        }

        LedgerSummary {
            total_billed,
            total_collected,
            total_outstanding: total_billed - total_collected,
            collected_today,
        }
    }

    async fn sums(&self, patient_id: Uuid) -> (Decimal, Decimal) {
        let entries = self.entries.read().await;
        match entries.get(&patient_id) {
            Some(rows) => (
                rows.iter().map(|e| e.amount_total).sum(),
                rows.iter().map(|e| e.amount_paid).sum(),
            ),
            None => (Decimal::ZERO, Decimal::ZERO),
        }
    }

    fn publish(&self, entry: &LedgerEntry) {
        match serde_json::to_value(entry) {
            Ok(payload) => self.broadcaster.publish(ChangeEvent::new(
                EntityKind::LedgerEntry,
                entry.id,
                entry.updated_at,
                payload,
            )),
            Err(e) => tracing::warn!("Failed to serialize ledger entry for broadcast: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use rand::Rng;
    use scheduling_cell::ManualClock;

    /// Clinic-local Monday morning, UTC+05:30.
    fn ledger() -> PaymentLedgerService {
        let offset = FixedOffset::east_opt(330 * 60).unwrap();
        let clock = ManualClock::new(offset.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap());
        PaymentLedgerService::new(Arc::new(RealtimeBroadcaster::new()), Arc::new(clock))
    }

    fn dec(units: i64, cents: u32) -> Decimal {
        Decimal::new(units * 100 + cents as i64, 2)
    }

    #[tokio::test]
    async fn balance_is_billed_minus_paid() {
        let ledger = ledger();
        let patient = Uuid::new_v4();
        let now = Utc::now();

        ledger
            .record_entry(patient, dec(1000, 0), dec(400, 0), PaymentMethod::Cash, None, now)
            .await
            .unwrap();

        assert_eq!(ledger.balance(patient).await, dec(600, 0));
        assert_eq!(ledger.status(patient).await, PaymentStatus::Partial);
    }

    #[tokio::test]
    async fn settling_entry_with_zero_total_reaches_paid() {
        let ledger = ledger();
        let patient = Uuid::new_v4();
        let now = Utc::now();

        ledger
            .record_entry(patient, dec(1000, 0), dec(400, 0), PaymentMethod::Cash, None, now)
            .await
            .unwrap();
        ledger
            .record_entry(patient, Decimal::ZERO, dec(600, 0), PaymentMethod::Upi, None, now)
            .await
            .unwrap();

        assert_eq!(ledger.balance(patient).await, Decimal::ZERO);
        assert_eq!(ledger.status(patient).await, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn status_derivation_covers_all_cases() {
        assert_eq!(derive_status(Decimal::ZERO, Decimal::ZERO), PaymentStatus::NoDues);
        assert_eq!(derive_status(dec(500, 0), Decimal::ZERO), PaymentStatus::Unpaid);
        assert_eq!(derive_status(dec(500, 0), dec(100, 0)), PaymentStatus::Partial);
        assert_eq!(derive_status(dec(500, 0), dec(500, 0)), PaymentStatus::Paid);
        assert_eq!(derive_status(dec(500, 0), dec(700, 0)), PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn negative_amounts_are_rejected() {
        let ledger = ledger();
        let result = ledger
            .record_entry(
                Uuid::new_v4(),
                Decimal::new(-1, 0),
                Decimal::ZERO,
                PaymentMethod::Cash,
                None,
                Utc::now(),
            )
            .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_patient_has_no_dues_and_no_ledger() {
        let ledger = ledger();
        let patient = Uuid::new_v4();
        assert_eq!(ledger.balance(patient).await, Decimal::ZERO);
        assert_eq!(ledger.status(patient).await, PaymentStatus::NoDues);
        assert!(matches!(
            ledger.patient_ledger(patient).await,
            Err(LedgerError::PatientNotFound)
        ));
    }

    /// Ten thousand randomized decimal entries must sum exactly, with no
    /// floating-point accumulation drift.
    #[tokio::test]
    async fn no_drift_after_ten_thousand_entries() {
        let ledger = ledger();
        let patient = Uuid::new_v4();
        let now = Utc::now();
        let mut rng = rand::thread_rng();

        let mut expected_total = Decimal::ZERO;
        let mut expected_paid = Decimal::ZERO;

        for _ in 0..10_000 {
            // Amounts like 123.45 with two decimal places.
            let total = Decimal::new(rng.gen_range(0..100_000), 2);
            let paid = Decimal::new(rng.gen_range(0..100_000), 2);
            expected_total += total;
            expected_paid += paid;
            ledger
                .record_entry(patient, total, paid, PaymentMethod::Card, None, now)
                .await
                .unwrap();
        }

        assert_eq!(ledger.balance(patient).await, expected_total - expected_paid);
        let snapshot = ledger.patient_ledger(patient).await.unwrap();
        assert_eq!(snapshot.total_billed, expected_total);
        assert_eq!(snapshot.total_paid, expected_paid);
        assert_eq!(snapshot.entries.len(), 10_000);
    }

    #[tokio::test]
    async fn summary_counts_today_in_clinic_local_time() {
        let ledger = ledger();
        // 08:30 local on the clock's day.
        let this_morning = Utc.with_ymd_and_hms(2025, 6, 2, 3, 0, 0).unwrap();
        // 01:00 local on the clock's day - still the previous day in UTC.
        let after_local_midnight = Utc.with_ymd_and_hms(2025, 6, 1, 19, 30, 0).unwrap();
        // 23:00 local on the previous day.
        let yesterday_evening = Utc.with_ymd_and_hms(2025, 6, 1, 17, 30, 0).unwrap();

        ledger
            .record_entry(Uuid::new_v4(), dec(1000, 0), dec(300, 0), PaymentMethod::Cash, None, this_morning)
            .await
            .unwrap();
        ledger
            .record_entry(Uuid::new_v4(), Decimal::ZERO, dec(200, 0), PaymentMethod::Upi, None, after_local_midnight)
            .await
            .unwrap();
        ledger
            .record_entry(Uuid::new_v4(), dec(500, 0), dec(500, 0), PaymentMethod::Card, None, yesterday_evening)
            .await
            .unwrap();

        let summary = ledger.summary().await;
        assert_eq!(summary.total_billed, dec(1500, 0));
        assert_eq!(summary.total_collected, dec(1000, 0));
        assert_eq!(summary.total_outstanding, dec(500, 0));
        assert_eq!(summary.collected_today, dec(500, 0));
    }
}
