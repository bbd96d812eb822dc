// libs/notification-cell/src/services/mod.rs
pub mod channel;
pub mod dispatcher;
