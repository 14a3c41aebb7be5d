//! Axum router for coupon endpoints.

use axum::{routing::post, Router};

use super::super::AppState;
use super::handlers::{redeem_coupon, validate_coupon};

/// Coupon API routes, mounted at `/api/coupons`.
///
/// - `POST /validate` - check a code (read-only)
/// - `POST /redeem` - redeem a code (at most once per user)
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/validate", post(validate_coupon))
        .route("/redeem", post(redeem_coupon))
}
