// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::handlers;
use crate::services::lifecycle::AppointmentLifecycleService;

pub fn appointment_routes(service: Arc<AppointmentLifecycleService>) -> Router {
    Router::new()
        .route(
            "/",
            post(handlers::submit_appointment).get(handlers::list_appointments),
        )
        .route("/slots", get(handlers::get_available_slots))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment).delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/accept", post(handlers::accept_appointment))
        .route("/{appointment_id}/reject", post(handlers::reject_appointment))
        .route(
            "/{appointment_id}/reschedule",
            patch(handlers::reschedule_appointment),
        )
        .route("/{appointment_id}/read", post(handlers::mark_appointment_read))
        .with_state(service)
}
