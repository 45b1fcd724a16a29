//! HTTP routes

pub mod analyze;
pub mod health;
