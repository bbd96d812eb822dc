// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    AcceptAppointmentRequest, AppointmentError, RescheduleAppointmentRequest,
    SubmitAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::Validation(msg) => AppError::BadRequest(msg),
            AppointmentError::SlotUnavailable => AppError::Conflict(e.to_string()),
            AppointmentError::NotFound => AppError::NotFound(e.to_string()),
            AppointmentError::InvalidTransition { .. } => AppError::Conflict(e.to_string()),
            AppointmentError::Storage(msg) => AppError::Internal(msg),
        }
    }
}

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

pub async fn get_available_slots(
    State(service): State<Arc<AppointmentLifecycleService>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = service.available(query.date).await;
    Ok(Json(json!({ "date": query.date, "slots": slots })))
}

pub async fn submit_appointment(
    State(service): State<Arc<AppointmentLifecycleService>>,
    Json(request): Json<SubmitAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = service.submit(request).await?;
    Ok(Json(json!({ "appointment": appointment })))
}

pub async fn list_appointments(
    State(service): State<Arc<AppointmentLifecycleService>>,
) -> Result<Json<Value>, AppError> {
    let appointments = service.list().await;
    Ok(Json(json!({ "appointments": appointments })))
}

pub async fn get_appointment(
    State(service): State<Arc<AppointmentLifecycleService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = service.get(appointment_id).await?;
    Ok(Json(json!({ "appointment": appointment })))
}

pub async fn accept_appointment(
    State(service): State<Arc<AppointmentLifecycleService>>,
    Path(appointment_id): Path<Uuid>,
    request: Option<Json<AcceptAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    let billable = request.map(|Json(r)| r.billable).unwrap_or(None);
    let appointment = service.accept(appointment_id, billable).await?;
    Ok(Json(json!({ "appointment": appointment })))
}

pub async fn reject_appointment(
    State(service): State<Arc<AppointmentLifecycleService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = service.reject(appointment_id).await?;
    Ok(Json(json!({ "appointment": appointment })))
}

pub async fn reschedule_appointment(
    State(service): State<Arc<AppointmentLifecycleService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = service
        .reschedule(appointment_id, request.date, request.time, request.billable)
        .await?;
    Ok(Json(json!({ "appointment": appointment })))
}

pub async fn delete_appointment(
    State(service): State<Arc<AppointmentLifecycleService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    service.delete(appointment_id).await?;
    Ok(Json(json!({ "deleted": true })))
}

pub async fn mark_appointment_read(
    State(service): State<Arc<AppointmentLifecycleService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = service.mark_read(appointment_id).await?;
    Ok(Json(json!({ "appointment": appointment })))
}
