// libs/payment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::ledger::PaymentLedgerService;

pub fn payment_routes(ledger: Arc<PaymentLedgerService>) -> Router {
    Router::new()
        .route("/", post(handlers::record_payment))
        .route("/summary", get(handlers::get_summary))
        .route("/{patient_id}", get(handlers::get_patient_ledger))
        .with_state(ledger)
}
