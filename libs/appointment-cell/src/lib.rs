// libs/appointment-cell/src/lib.rs
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::{Appointment, AppointmentError, AppointmentStatus, SubmitAppointmentRequest};
pub use router::appointment_routes;
pub use services::lifecycle::{AppointmentLifecycleService, StoreFailureSink};
pub use store::{AppointmentStore, MemoryAppointmentStore, StoreError};
