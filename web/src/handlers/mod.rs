//! HTTP request handlers, one module per audience.

pub mod admin;
pub mod customer;
pub mod driver;
pub mod health;

pub use health::{health_check, readiness_check};
