use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;

use appointment_cell::router::appointment_routes;
use appointment_cell::services::lifecycle::AppointmentLifecycleService;
use inquiry_cell::router::inquiry_routes;
use inquiry_cell::InquiryService;
use patient_cell::router::patient_routes;
use patient_cell::PatientRegistry;
use payment_cell::router::payment_routes;
use payment_cell::PaymentLedgerService;
use realtime_cell::RealtimeBroadcaster;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<AppointmentLifecycleService>,
    pub registry: Arc<PatientRegistry>,
    pub ledger: Arc<PaymentLedgerService>,
    pub inquiries: Arc<InquiryService>,
    pub broadcaster: Arc<RealtimeBroadcaster>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic API is running!" }))
        .nest("/appointments", appointment_routes(state.lifecycle))
        .nest("/patients", patient_routes(state.registry))
        .nest("/payments", payment_routes(state.ledger))
        .nest("/inquiries", inquiry_routes(state.inquiries))
        .route("/realtime/subscribe", get(subscribe).with_state(state.broadcaster))
}

/// Admin dashboard change feed. Every committed mutation is pushed as one
/// SSE event; the dashboard merges them into its session view.
async fn subscribe(
    State(broadcaster): State<Arc<RealtimeBroadcaster>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = broadcaster.subscribe();
    let stream = futures::stream::unfold(subscription, |mut subscription| async move {
        let change = subscription.next().await?;
        let event = Event::default().json_data(&change).ok()?;
        Some((Ok(event), subscription))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
