// libs/patient-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};

use crate::handlers;
use crate::services::registry::PatientRegistry;

pub fn patient_routes(registry: Arc<PatientRegistry>) -> Router {
    Router::new()
        .route("/", get(handlers::list_patients))
        .route("/{patient_id}", get(handlers::get_patient))
        .route("/{patient_id}", put(handlers::update_patient))
        .with_state(registry)
}
