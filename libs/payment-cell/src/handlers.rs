// libs/payment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{LedgerError, RecordPaymentRequest};
use crate::services::ledger::PaymentLedgerService;

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::PatientNotFound => AppError::NotFound(e.to_string()),
            LedgerError::Validation(msg) => AppError::BadRequest(msg),
        }
    }
}

pub async fn record_payment(
    State(ledger): State<Arc<PaymentLedgerService>>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let entry = ledger
        .record_entry(
            request.patient_id,
            request.amount_total,
            request.amount_paid,
            request.method,
            request.note,
            Utc::now(),
        )
        .await?;
    Ok(Json(json!({ "entry": entry })))
}

pub async fn get_patient_ledger(
    State(ledger): State<Arc<PaymentLedgerService>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let snapshot = ledger.patient_ledger(patient_id).await?;
    Ok(Json(json!({ "ledger": snapshot })))
}

pub async fn get_summary(
    State(ledger): State<Arc<PaymentLedgerService>>,
) -> Result<Json<Value>, AppError> {
    let summary = ledger.summary().await;
    Ok(Json(json!({ "summary": summary })))
}
