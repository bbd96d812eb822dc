// libs/inquiry-cell/src/lib.rs
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Inquiry, InquiryError};
pub use router::inquiry_routes;
pub use services::inquiry::InquiryService;
