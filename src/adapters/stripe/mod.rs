//! Stripe adapter - live API client, wire types, and a test double.

mod mock_payment_provider;
mod stripe_adapter;
mod webhook_types;

pub use mock_payment_provider::MockPaymentProvider;
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
pub use webhook_types::{hex_encode, signature_for, SignatureHeader};
