//! Axum routers for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::super::AppState;
use super::handlers::{billing_portal, create_checkout, handle_stripe_webhook};

/// Billing API routes, mounted at `/api/billing`.
///
/// - `POST /checkout` - start a hosted checkout (authenticated)
/// - `GET  /portal` - hosted billing-portal URL (authenticated)
pub fn billing_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/portal", get(billing_portal))
}

/// Webhook routes, mounted at `/api/webhooks`.
///
/// Separate from the billing routes because webhooks carry no user
/// authentication; they are verified by signature.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}
