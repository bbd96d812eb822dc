// libs/inquiry-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{InquiryError, SubmitInquiryRequest};
use crate::services::inquiry::InquiryService;

impl From<InquiryError> for AppError {
    fn from(e: InquiryError) -> Self {
        match e {
            InquiryError::NotFound => AppError::NotFound(e.to_string()),
            InquiryError::Validation(msg) => AppError::BadRequest(msg),
        }
    }
}

pub async fn submit_inquiry(
    State(service): State<Arc<InquiryService>>,
    Json(request): Json<SubmitInquiryRequest>,
) -> Result<Json<Value>, AppError> {
    let inquiry = service
        .submit(
            &request.name,
            &request.email,
            &request.phone,
            &request.message,
            Utc::now(),
        )
        .await?;
    Ok(Json(json!({ "inquiry": inquiry })))
}

pub async fn list_inquiries(
    State(service): State<Arc<InquiryService>>,
) -> Result<Json<Value>, AppError> {
    let inquiries = service.list().await;
    Ok(Json(json!({ "inquiries": inquiries })))
}

pub async fn mark_inquiry_read(
    State(service): State<Arc<InquiryService>>,
    Path(inquiry_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let inquiry = service.mark_read(inquiry_id).await?;
    Ok(Json(json!({ "inquiry": inquiry })))
}
