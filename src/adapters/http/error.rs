//! API error mapping.
//!
//! Converts domain errors into HTTP responses with stable error codes.
//! Coupon validation *outcomes* never pass through here - they are 200
//! responses - only redemption failures and operational errors do.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::coupon::{CouponError, CouponInvalidReason};
use crate::domain::entitlement::BillingError;
use crate::domain::foundation::ValidationError;

/// JSON body for every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// API-level error wrapper.
pub enum ApiError {
    Validation(ValidationError),
    Coupon(CouponError),
    Billing(BillingError),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<CouponError> for ApiError {
    fn from(err: CouponError) -> Self {
        ApiError::Coupon(err)
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        ApiError::Billing(err)
    }
}

fn reason_code(reason: &CouponInvalidReason) -> String {
    format!("VALIDATION_{}", reason.as_str())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(err) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_FAILED", err.to_string()),
            ),

            ApiError::Coupon(err) => match &err {
                CouponError::NotRedeemable { reason, .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorResponse::new(reason_code(reason), err.to_string()),
                ),
                CouponError::AlreadyRedeemed { .. } => (
                    StatusCode::CONFLICT,
                    ErrorResponse::new("ALREADY_REDEEMED", err.to_string()),
                ),
                CouponError::RaceLost { .. } => (
                    StatusCode::CONFLICT,
                    ErrorResponse::new(
                        "RACE_LOST",
                        "This coupon is no longer available. Please try again.",
                    ),
                ),
                CouponError::Infrastructure(_) => internal(),
            },

            ApiError::Billing(err) => match &err {
                BillingError::NoSubscription(_) => (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("NO_SUBSCRIPTION", err.to_string()),
                ),
                BillingError::PlanNotPurchasable(_) => (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("PLAN_NOT_PURCHASABLE", err.to_string()),
                ),
                BillingError::CouponRejected { reason, .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorResponse::new(reason_code(reason), err.to_string()),
                ),
                BillingError::CouponAlreadyUsed { .. } => (
                    StatusCode::CONFLICT,
                    ErrorResponse::new("ALREADY_REDEEMED", err.to_string()),
                ),
                BillingError::CheckoutInProgress { .. } => (
                    StatusCode::CONFLICT,
                    ErrorResponse::new("CHECKOUT_IN_PROGRESS", err.to_string()),
                ),
                BillingError::Provider { .. } => (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::new(
                        "PROVIDER_ERROR",
                        "Payment service is unavailable. Please try again.",
                    ),
                ),
                BillingError::InvalidWebhookSignature => (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::new("INVALID_WEBHOOK_SIGNATURE", err.to_string()),
                ),
                BillingError::Infrastructure(_) => internal(),
            },
        };

        (status, Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, ErrorResponse) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorResponse::new("INTERNAL_ERROR", "Something went wrong. Please try again."),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_follow_taxonomy() {
        assert_eq!(
            reason_code(&CouponInvalidReason::NotFound),
            "VALIDATION_NOT_FOUND"
        );
        assert_eq!(
            reason_code(&CouponInvalidReason::Expired),
            "VALIDATION_EXPIRED"
        );
        assert_eq!(
            reason_code(&CouponInvalidReason::Exhausted),
            "VALIDATION_EXHAUSTED"
        );
    }

    #[test]
    fn race_lost_maps_to_conflict() {
        let response = ApiError::Coupon(CouponError::race_lost("LASTONE")).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn provider_error_maps_to_bad_gateway() {
        let response =
            ApiError::Billing(BillingError::provider("internal detail")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn infrastructure_details_are_not_leaked() {
        let err = CouponError::infrastructure("password=hunter2 in connection string");
        let response = ApiError::Coupon(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
