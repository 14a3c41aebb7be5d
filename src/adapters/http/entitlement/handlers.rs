//! HTTP handlers for access-check endpoints.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::application::handlers::access::CheckAccessQuery;
use crate::domain::entitlement::SubscriptionTier;

use super::super::auth::AuthenticatedUser;
use super::super::error::ApiError;
use super::super::AppState;
use super::dto::AccessCheckResponse;

/// GET /api/access/{tier} - May the current user view content gated at `tier`?
pub async fn check_access(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(required): Path<SubscriptionTier>,
) -> Result<impl IntoResponse, ApiError> {
    let handler = state.check_access_handler();
    let result = handler
        .handle(CheckAccessQuery {
            user_id: user.user_id,
            required,
        })
        .await?;

    Ok(Json(AccessCheckResponse::from(result)))
}
