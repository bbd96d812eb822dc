// libs/inquiry-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::inquiry::InquiryService;

pub fn inquiry_routes(service: Arc<InquiryService>) -> Router {
    Router::new()
        .route("/", post(handlers::submit_inquiry).get(handlers::list_inquiries))
        .route("/{inquiry_id}/read", post(handlers::mark_inquiry_read))
        .with_state(service)
}
