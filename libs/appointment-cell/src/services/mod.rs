// libs/appointment-cell/src/services/mod.rs
pub mod lifecycle;
