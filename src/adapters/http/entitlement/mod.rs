//! Access-check HTTP module.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::access_routes;
