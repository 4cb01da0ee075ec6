//! Automatic discount rules, coupons and the engine that applies them.

mod coupon;
mod engine;
mod rule;

pub use coupon::{normalize_code, Coupon};
pub use engine::{
    AppliedDiscount, CouponBasis, DiscountEngine, DiscountInput, DiscountOrigin, DiscountResult,
};
pub use rule::{
    DiscountCondition, DiscountRule, DiscountScope, DiscountTerms, DiscountType, DiscountValue,
    Tier, TierValue,
};
