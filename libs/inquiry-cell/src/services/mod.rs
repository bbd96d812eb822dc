// libs/inquiry-cell/src/services/mod.rs
pub mod inquiry;
