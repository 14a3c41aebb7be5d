//! Ports - contracts between the domain/application layers and the
//! outside world. Implementations live under `adapters`.

mod coupon_store;
mod payment_provider;
mod profile_repository;
mod webhook_event_repository;

pub use coupon_store::{CouponStore, RedeemOutcome};
pub use payment_provider::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer, PaymentError,
    PaymentErrorCode, PaymentProvider, PortalSession, ProviderSubscriptionStatus, WebhookEvent,
    WebhookEventData, WebhookEventType,
};
pub use profile_repository::{ProfileRepository, ProfileSyncResult};
pub use webhook_event_repository::{
    SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookResult,
};
