//! Axum router for access-check endpoints.

use axum::{routing::get, Router};

use super::super::AppState;
use super::handlers::check_access;

/// Access API routes, mounted at `/api/access`.
///
/// - `GET /:tier` - access decision for the authenticated user
pub fn access_routes() -> Router<AppState> {
    Router::new().route("/:tier", get(check_access))
}
