//! Coupon command and query handlers.

mod redeem_coupon;
mod validate_coupon;

pub use redeem_coupon::{RedeemCouponCommand, RedeemCouponHandler, RedeemCouponResult};
pub use validate_coupon::{ValidateCouponHandler, ValidateCouponQuery, ValidateCouponResult};
