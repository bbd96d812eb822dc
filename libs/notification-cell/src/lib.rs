// libs/notification-cell/src/lib.rs
pub mod models;
pub mod services;

pub use models::{NotificationError, NotificationEvent, OutboundMessage, RetryPolicy};
pub use services::channel::{HttpSendChannel, LogSendChannel, SendChannel};
pub use services::dispatcher::{
    DeliveryFailureSink, NoopFailureSink, NotificationDispatcher,
};
