//! Discount value object.

use serde::{Deserialize, Serialize};

/// Kind of discount a coupon grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Percentage off, value in whole percent points (0-100).
    Percentage,
    /// Fixed amount off, value in cents.
    Fixed,
}

/// A coupon's discount: type plus magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub discount_type: DiscountType,
    pub value: i64,
}

impl Discount {
    pub fn percentage(percent: i64) -> Self {
        Self {
            discount_type: DiscountType::Percentage,
            value: percent,
        }
    }

    pub fn fixed(cents: i64) -> Self {
        Self {
            discount_type: DiscountType::Fixed,
            value: cents,
        }
    }

    /// Applies the discount to an amount in cents.
    ///
    /// The result never goes below zero, and percentage values are
    /// clamped to 0-100 so a misconfigured coupon cannot invert a price.
    pub fn apply_to(&self, amount_cents: i64) -> i64 {
        match self.discount_type {
            DiscountType::Percentage => {
                let percent = self.value.clamp(0, 100);
                amount_cents - (amount_cents * percent) / 100
            }
            DiscountType::Fixed => (amount_cents - self.value.max(0)).max(0),
        }
    }
}
