//! HTTP handlers for coupon endpoints.

use axum::extract::{Json, State};
use axum::response::IntoResponse;

use crate::application::handlers::coupon::{RedeemCouponCommand, ValidateCouponQuery};
use crate::domain::coupon::CouponCode;

use super::super::auth::AuthenticatedUser;
use super::super::error::ApiError;
use super::super::AppState;
use super::dto::{
    CouponSummary, RedeemCouponRequest, RedeemCouponResponse, ValidateCouponRequest,
    ValidateCouponResponse,
};

/// POST /api/coupons/validate - Validate a coupon code for the current user.
///
/// Returns 200 for every validation outcome (valid, invalid, already
/// used); 400 only for a malformed code, 401 when unauthenticated.
pub async fn validate_coupon(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ValidateCouponRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let code = CouponCode::try_new(&request.code)?;

    let handler = state.validate_coupon_handler();
    let result = handler
        .handle(ValidateCouponQuery {
            user_id: user.user_id,
            code,
        })
        .await?;

    Ok(Json(ValidateCouponResponse::from(result)))
}

/// POST /api/coupons/redeem - Redeem a coupon for the current user.
pub async fn redeem_coupon(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<RedeemCouponRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let code = CouponCode::try_new(&request.code)?;

    let handler = state.redeem_coupon_handler();
    let result = handler
        .handle(RedeemCouponCommand {
            user_id: user.user_id,
            code,
        })
        .await?;

    Ok(Json(RedeemCouponResponse {
        success: true,
        coupon: CouponSummary::from(&result.coupon),
    }))
}
