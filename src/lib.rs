//! Kickoff Club HQ - Entitlement & Redemption Engine
//!
//! Decides whether a user may access tier-gated football education
//! content, and whether a discount coupon may be applied to a user's
//! checkout, exactly once per user. Subscription state is kept in sync
//! with the billing provider through idempotent webhook processing.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
