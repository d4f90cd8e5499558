//! Request and response DTOs

pub mod billing;
