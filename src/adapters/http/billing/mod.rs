//! Billing HTTP module.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::{billing_routes, webhook_routes};
