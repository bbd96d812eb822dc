pub mod broadcaster;
pub mod session;
