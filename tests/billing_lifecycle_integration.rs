//! Integration tests for the checkout and webhook-sync lifecycle.
//!
//! Drives the billing handlers against the in-memory adapters and the
//! mock payment provider, then checks access decisions against the
//! synced profile state.

use std::sync::Arc;

use kickoff_hq::adapters::memory::{
    InMemoryCouponStore, InMemoryProfileRepository, InMemoryWebhookEventRepository,
};
use kickoff_hq::adapters::stripe::MockPaymentProvider;
use kickoff_hq::application::handlers::access::{CheckAccessHandler, CheckAccessQuery};
use kickoff_hq::application::handlers::billing::{
    CreateCheckoutCommand, CreateCheckoutHandler, HandleBillingWebhookCommand,
    HandleBillingWebhookHandler, ManageBillingHandler, ManageBillingQuery,
};
use kickoff_hq::domain::entitlement::{
    BillingError, PlanCatalog, SubscriptionStatus, SubscriptionTier,
};
use kickoff_hq::domain::foundation::UserId;
use kickoff_hq::ports::{
    ProfileRepository, ProviderSubscriptionStatus, WebhookEvent, WebhookEventData,
    WebhookEventType, WebhookResult,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct App {
    profiles: Arc<InMemoryProfileRepository>,
    payment: Arc<MockPaymentProvider>,
    checkout: CreateCheckoutHandler,
    portal: ManageBillingHandler,
    webhook: HandleBillingWebhookHandler,
    access: CheckAccessHandler,
}

fn plans() -> PlanCatalog {
    PlanCatalog::new("price_basic_999", "price_premium_1999")
}

fn app() -> App {
    let profiles = Arc::new(InMemoryProfileRepository::new());
    let coupons = Arc::new(InMemoryCouponStore::with_coupons(vec![]));
    let events = Arc::new(InMemoryWebhookEventRepository::new());
    let payment = Arc::new(MockPaymentProvider::new());

    App {
        profiles: profiles.clone(),
        payment: payment.clone(),
        checkout: CreateCheckoutHandler::new(
            profiles.clone(),
            coupons,
            payment.clone(),
            plans(),
        ),
        portal: ManageBillingHandler::new(profiles.clone(), payment.clone()),
        webhook: HandleBillingWebhookHandler::new(
            profiles.clone(),
            events,
            payment.clone(),
            plans(),
        ),
        access: CheckAccessHandler::new(profiles),
    }
}

fn user() -> UserId {
    UserId::new("u1").unwrap()
}

fn checkout_cmd(plan: SubscriptionTier) -> CreateCheckoutCommand {
    CreateCheckoutCommand {
        user_id: user(),
        email: "keeper@kickoffhq.test".to_string(),
        plan,
        success_url: "https://kickoffhq.test/done".to_string(),
        cancel_url: "https://kickoffhq.test/cancel".to_string(),
        coupon_code: None,
    }
}

async fn deliver(app: &App, event: &WebhookEvent) -> WebhookResult {
    let payload = serde_json::to_vec(event).unwrap();
    let signature = app.payment.sign(event);
    app.webhook
        .handle(HandleBillingWebhookCommand { payload, signature })
        .await
        .unwrap()
}

async fn customer_id(app: &App) -> String {
    app.profiles
        .find_by_user(&user())
        .await
        .unwrap()
        .unwrap()
        .stripe_customer_id
        .unwrap()
}

fn checkout_completed(id: &str, created: i64, customer: &str, plan: SubscriptionTier) -> WebhookEvent {
    WebhookEvent {
        id: id.to_string(),
        event_type: WebhookEventType::CheckoutSessionCompleted,
        data: WebhookEventData::Checkout {
            session_id: "cs_1".to_string(),
            customer_id: customer.to_string(),
            subscription_id: Some("sub_1".to_string()),
            user_id: Some("u1".to_string()),
            plan: Some(plan),
        },
        created_at: created,
    }
}

fn subscription_updated(
    id: &str,
    created: i64,
    customer: &str,
    status: ProviderSubscriptionStatus,
    price_id: &str,
) -> WebhookEvent {
    WebhookEvent {
        id: id.to_string(),
        event_type: WebhookEventType::SubscriptionUpdated,
        data: WebhookEventData::Subscription {
            subscription_id: "sub_1".to_string(),
            customer_id: customer.to_string(),
            status,
            price_id: Some(price_id.to_string()),
            current_period_end: created + 30 * 86_400,
        },
        created_at: created,
    }
}

async fn allowed(app: &App, required: SubscriptionTier) -> bool {
    app.access
        .handle(CheckAccessQuery {
            user_id: user(),
            required,
        })
        .await
        .unwrap()
        .allowed
}

// =============================================================================
// Lifecycle: checkout -> webhook activation -> access
// =============================================================================

#[tokio::test]
async fn checkout_then_webhook_grants_premium_access() {
    let app = app();

    let result = app.checkout.handle(checkout_cmd(SubscriptionTier::Premium)).await.unwrap();
    assert!(result.checkout_url.contains("checkout.stripe.test"));

    // Pending checkout grants nothing yet.
    assert!(!allowed(&app, SubscriptionTier::Premium).await);

    let customer = customer_id(&app).await;
    deliver(
        &app,
        &checkout_completed("evt_1", 1_700_000_000, &customer, SubscriptionTier::Premium),
    )
    .await;

    assert!(allowed(&app, SubscriptionTier::Free).await);
    assert!(allowed(&app, SubscriptionTier::Basic).await);
    assert!(allowed(&app, SubscriptionTier::Premium).await);

    let profile = app.profiles.find_by_user(&user()).await.unwrap().unwrap();
    assert_eq!(profile.status, SubscriptionStatus::Active);
    assert_eq!(profile.stripe_subscription_id.as_deref(), Some("sub_1"));
}

#[tokio::test]
async fn replayed_webhook_event_is_applied_once() {
    let app = app();
    app.checkout.handle(checkout_cmd(SubscriptionTier::Basic)).await.unwrap();
    let customer = customer_id(&app).await;

    let event = checkout_completed("evt_1", 1_700_000_000, &customer, SubscriptionTier::Basic);
    assert_eq!(deliver(&app, &event).await, WebhookResult::Processed);
    assert_eq!(deliver(&app, &event).await, WebhookResult::AlreadyProcessed);

    let profile = app.profiles.find_by_user(&user()).await.unwrap().unwrap();
    assert_eq!(profile.subscription_tier, SubscriptionTier::Basic);
}

#[tokio::test]
async fn out_of_order_events_resolve_to_newest_state() {
    let app = app();
    app.checkout.handle(checkout_cmd(SubscriptionTier::Premium)).await.unwrap();
    let customer = customer_id(&app).await;

    // The newer cancellation arrives first...
    deliver(
        &app,
        &subscription_updated(
            "evt_2",
            1_700_000_500,
            &customer,
            ProviderSubscriptionStatus::Canceled,
            "price_premium_1999",
        ),
    )
    .await;

    // ...then the older activation straggles in.
    deliver(
        &app,
        &checkout_completed("evt_1", 1_700_000_000, &customer, SubscriptionTier::Premium),
    )
    .await;

    let profile = app.profiles.find_by_user(&user()).await.unwrap().unwrap();
    assert_eq!(profile.status, SubscriptionStatus::Canceled);
    // Canceled keeps paid access until period end.
    assert!(allowed(&app, SubscriptionTier::Premium).await);
}

#[tokio::test]
async fn expiry_webhook_downgrades_access_to_free() {
    let app = app();
    app.checkout.handle(checkout_cmd(SubscriptionTier::Premium)).await.unwrap();
    let customer = customer_id(&app).await;

    deliver(
        &app,
        &checkout_completed("evt_1", 1_700_000_000, &customer, SubscriptionTier::Premium),
    )
    .await;

    let mut deleted = subscription_updated(
        "evt_2",
        1_700_100_000,
        &customer,
        ProviderSubscriptionStatus::Canceled,
        "price_premium_1999",
    );
    deleted.event_type = WebhookEventType::SubscriptionDeleted;
    deliver(&app, &deleted).await;

    assert!(allowed(&app, SubscriptionTier::Free).await);
    assert!(!allowed(&app, SubscriptionTier::Basic).await);
    assert!(!allowed(&app, SubscriptionTier::Premium).await);
}

// =============================================================================
// Billing portal
// =============================================================================

#[tokio::test]
async fn portal_requires_an_existing_customer() {
    let app = app();

    let before = app
        .portal
        .handle(ManageBillingQuery {
            user_id: user(),
            return_url: "/account".to_string(),
        })
        .await;
    assert!(matches!(before, Err(BillingError::NoSubscription(_))));

    app.checkout.handle(checkout_cmd(SubscriptionTier::Basic)).await.unwrap();

    let after = app
        .portal
        .handle(ManageBillingQuery {
            user_id: user(),
            return_url: "/account".to_string(),
        })
        .await
        .unwrap();
    assert!(after.portal_url.contains("billing.stripe.test"));
}
