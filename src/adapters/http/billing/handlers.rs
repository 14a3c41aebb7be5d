//! HTTP handlers for billing endpoints.

use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    CreateCheckoutCommand, HandleBillingWebhookCommand, ManageBillingQuery,
};

use super::super::auth::AuthenticatedUser;
use super::super::error::{ApiError, ErrorResponse};
use super::super::AppState;
use super::dto::{CheckoutResponse, CreateCheckoutRequest, PortalParams, PortalResponse};

/// POST /api/billing/checkout - Start a hosted checkout for a paid plan.
pub async fn create_checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let handler = state.create_checkout_handler();
    let result = handler
        .handle(CreateCheckoutCommand {
            user_id: user.user_id,
            email: request.email,
            plan: request.plan,
            success_url: request.success_url,
            cancel_url: request.cancel_url,
            coupon_code: request.coupon_code,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            success: true,
            url: result.checkout_url,
        }),
    ))
}

/// GET /api/billing/portal - Get a hosted billing-portal URL.
pub async fn billing_portal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<PortalParams>,
) -> Result<impl IntoResponse, ApiError> {
    let handler = state.manage_billing_handler();
    let result = handler
        .handle(ManageBillingQuery {
            user_id: user.user_id,
            return_url: params.return_url,
        })
        .await?;

    Ok(Json(PortalResponse {
        success: true,
        url: result.portal_url,
    }))
}

/// POST /api/webhooks/stripe - Handle provider webhook deliveries.
///
/// No user authentication; the signature header is the credential.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let Some(signature) = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
    else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "VALIDATION_FAILED",
                "Missing Stripe-Signature header",
            )),
        )
            .into_response());
    };

    let handler = state.billing_webhook_handler();
    handler
        .handle(HandleBillingWebhookCommand {
            payload: body.to_vec(),
            signature: signature.to_string(),
        })
        .await?;

    // Both "processed" and "already processed" acknowledge the delivery;
    // anything else became an error above and triggers a provider retry.
    Ok(StatusCode::OK.into_response())
}
