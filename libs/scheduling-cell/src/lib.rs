pub mod clock;
pub mod models;
pub mod services;

pub use clock::{Clock, ManualClock, SystemClock};
pub use models::CalendarPolicy;
pub use services::availability::available_slots;
