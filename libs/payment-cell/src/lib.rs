pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    derive_status, LedgerEntry, LedgerError, LedgerSummary, PatientLedger, PaymentMethod,
    PaymentStatus, RecordPaymentRequest,
};
pub use router::payment_routes;
pub use services::ledger::PaymentLedgerService;
