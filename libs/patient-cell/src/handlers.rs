// libs/patient-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{PatientError, UpdatePatientRequest};
use crate::services::registry::PatientRegistry;

impl From<PatientError> for AppError {
    fn from(e: PatientError) -> Self {
        match e {
            PatientError::NotFound => AppError::NotFound(e.to_string()),
            PatientError::Validation(msg) => AppError::BadRequest(msg),
        }
    }
}

pub async fn list_patients(
    State(registry): State<Arc<PatientRegistry>>,
) -> Result<Json<Value>, AppError> {
    let patients = registry.list().await;
    Ok(Json(json!({ "patients": patients })))
}

pub async fn get_patient(
    State(registry): State<Arc<PatientRegistry>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let patient = registry.get(patient_id).await?;
    Ok(Json(json!({ "patient": patient })))
}

pub async fn update_patient(
    State(registry): State<Arc<PatientRegistry>>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient = registry
        .update_patient(patient_id, request, Utc::now())
        .await?;
    Ok(Json(json!({ "patient": patient })))
}
