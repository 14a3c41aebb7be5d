//! HTTP adapter - axum routers, DTOs, and shared request state.

pub mod auth;
pub mod billing;
pub mod coupon;
pub mod entitlement;
pub mod error;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::application::handlers::access::CheckAccessHandler;
use crate::application::handlers::billing::{
    CreateCheckoutHandler, HandleBillingWebhookHandler, ManageBillingHandler,
};
use crate::application::handlers::coupon::{RedeemCouponHandler, ValidateCouponHandler};
use crate::domain::entitlement::PlanCatalog;
use crate::ports::{CouponStore, PaymentProvider, ProfileRepository, WebhookEventRepository};

/// Shared application state containing all dependencies.
///
/// Cloned per request; every dependency is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub coupons: Arc<dyn CouponStore>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub payment: Arc<dyn PaymentProvider>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub plans: PlanCatalog,
}

impl AppState {
    pub fn validate_coupon_handler(&self) -> ValidateCouponHandler {
        ValidateCouponHandler::new(self.coupons.clone())
    }

    pub fn redeem_coupon_handler(&self) -> RedeemCouponHandler {
        RedeemCouponHandler::new(self.coupons.clone())
    }

    pub fn check_access_handler(&self) -> CheckAccessHandler {
        CheckAccessHandler::new(self.profiles.clone())
    }

    pub fn create_checkout_handler(&self) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(
            self.profiles.clone(),
            self.coupons.clone(),
            self.payment.clone(),
            self.plans.clone(),
        )
    }

    pub fn manage_billing_handler(&self) -> ManageBillingHandler {
        ManageBillingHandler::new(self.profiles.clone(), self.payment.clone())
    }

    pub fn billing_webhook_handler(&self) -> HandleBillingWebhookHandler {
        HandleBillingWebhookHandler::new(
            self.profiles.clone(),
            self.webhook_events.clone(),
            self.payment.clone(),
            self.plans.clone(),
        )
    }
}

/// GET /health - liveness probe.
async fn health() -> &'static str {
    "ok"
}

/// Builds the complete API router.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/coupons", coupon::coupon_routes())
        .nest("/api/billing", billing::billing_routes())
        .nest("/api/access", entitlement::access_routes())
        .nest("/api/webhooks", billing::webhook_routes())
        .with_state(state)
}
