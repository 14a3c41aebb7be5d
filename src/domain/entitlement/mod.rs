//! Entitlement domain - tiers, subscription lifecycle, and user profiles.
//!
//! The access decision for every content-serving request reduces to
//! `profile.subscription_tier.has_access(required)`; everything else in
//! this module exists to keep that tier correct as billing state changes.

mod errors;
mod plan;
mod profile;
mod status;
mod tier;

pub use errors::BillingError;
pub use plan::PlanCatalog;
pub use profile::{BillingUpdate, SyncOutcome, UserProfile};
pub use status::SubscriptionStatus;
pub use tier::SubscriptionTier;
