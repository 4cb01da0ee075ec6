//! Final cart breakdown.

use super::shipping::ShippingPolicy;
use crate::catalog::Availability;
use crate::discount::{AppliedDiscount, DiscountResult};
use crate::error::{CouponError, PricingError};
use crate::ids::{ProductId, VariantId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Advisory stock check for one line. Not a reservation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineAvailability {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    pub requested: i64,
    pub available: Availability,
    /// `available` covers `requested`.
    pub sufficient: bool,
}

impl LineAvailability {
    pub fn new(
        product_id: ProductId,
        variant_id: Option<VariantId>,
        requested: i64,
        available: Availability,
    ) -> Self {
        let sufficient = u64::try_from(requested)
            .map(|qty| available.covers(qty))
            .unwrap_or(false);
        Self {
            product_id,
            variant_id,
            requested,
            available,
            sufficient,
        }
    }
}

/// Complete pricing breakdown for a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartBreakdown {
    /// Subtotal before discounts.
    pub subtotal: Money,
    /// Discounts in the order they were applied.
    pub applied_discounts: Vec<AppliedDiscount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_applied: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_error: Option<CouponError>,
    pub shipping: Money,
    /// Subtotal minus discounts, never negative.
    pub total: Money,
    /// `total + shipping`.
    pub grand_total: Money,
    /// `subtotal - total`.
    pub savings: Money,
    /// Spend needed to reach free shipping. Absent without a threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_to_free_shipping: Option<Money>,
    #[serde(default)]
    pub line_availability: Vec<LineAvailability>,
    /// Catalog snapshot this was computed from.
    #[serde(default)]
    pub snapshot_version: u64,
    /// Request sequence number.
    #[serde(default)]
    pub seq: u64,
}

impl CartBreakdown {
    /// Check if any discounts are applied.
    pub fn has_discounts(&self) -> bool {
        !self.applied_discounts.is_empty()
    }

    /// Total removed by discounts.
    pub fn discount_total(&self) -> Money {
        self.savings
    }

    pub fn ships_free(&self) -> bool {
        self.shipping.is_zero()
    }

    /// Lines whose requested quantity exceeds current stock.
    pub fn short_lines(&self) -> impl Iterator<Item = &LineAvailability> {
        self.line_availability.iter().filter(|l| !l.sufficient)
    }

    pub fn with_line_availability(mut self, lines: Vec<LineAvailability>) -> Self {
        self.line_availability = lines;
        self
    }

    pub fn stamped(mut self, seq: u64, snapshot_version: u64) -> Self {
        self.seq = seq;
        self.snapshot_version = snapshot_version;
        self
    }
}

/// Merge a discount result with shipping into a breakdown.
///
/// Shipping compares the discounted total, not the raw subtotal, against the
/// threshold.
pub fn aggregate(
    result: DiscountResult,
    policy: &ShippingPolicy,
) -> Result<CartBreakdown, PricingError> {
    policy.validate()?;
    if policy.currency() != result.total.currency {
        return Err(PricingError::CurrencyMismatch {
            expected: result.total.currency.code().to_string(),
            got: policy.currency().code().to_string(),
        });
    }

    let shipping = policy.cost_for(result.total, result.free_shipping);
    let grand_total = result
        .total
        .try_add(&shipping)
        .ok_or_else(|| PricingError::overflow("grand total"))?;

    let reconciled = result
        .subtotal
        .try_subtract(&result.savings)
        .is_some_and(|t| t == result.total);
    if result.total.is_negative() || result.savings.is_negative() || !reconciled {
        return Err(PricingError::ArithmeticInvariantViolation(format!(
            "subtotal {} savings {} total {} do not reconcile",
            result.subtotal, result.savings, result.total
        )));
    }

    Ok(CartBreakdown {
        amount_to_free_shipping: policy.remaining_for_free(result.total, result.free_shipping),
        subtotal: result.subtotal,
        applied_discounts: result.applied_discounts,
        coupon_applied: result.coupon_applied,
        coupon_error: result.coupon_error,
        shipping,
        total: result.total,
        grand_total,
        savings: result.savings,
        line_availability: Vec::new(),
        snapshot_version: 0,
        seq: 0,
    })
}
