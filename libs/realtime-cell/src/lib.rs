pub mod models;
pub mod services;

pub use models::{ChangeEvent, EntityKind};
pub use services::broadcaster::{RealtimeBroadcaster, SessionSubscription};
pub use services::session::SessionView;
