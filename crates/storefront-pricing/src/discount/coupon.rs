//! Coupon codes.

use super::rule::{DiscountTerms, DiscountValue};
use crate::cart::PricedLine;
use crate::error::{CouponError, PricingError};
use crate::ids::CouponId;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// A code-activated discount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Coupon {
    pub id: CouponId,
    /// Code the shopper types. Matched after [`normalize_code`].
    pub code: String,
    pub name: String,
    #[serde(flatten)]
    pub terms: DiscountTerms,
}

impl Coupon {
    pub fn new(
        id: impl Into<CouponId>,
        code: impl Into<String>,
        name: impl Into<String>,
        value: DiscountValue,
    ) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name: name.into(),
            terms: DiscountTerms::new(value),
        }
    }

    /// Create a percentage coupon.
    pub fn percentage(
        id: impl Into<CouponId>,
        code: impl Into<String>,
        name: impl Into<String>,
        basis_points: u32,
    ) -> Self {
        Self::new(
            id,
            code,
            name,
            DiscountValue::Percentage {
                basis_points,
                max_amount: None,
            },
        )
    }

    pub fn with_terms(mut self, terms: DiscountTerms) -> Self {
        self.terms = terms;
        self
    }

    /// Set expiration date.
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.terms.ends_at = Some(timestamp);
        self
    }

    pub fn starts_at(mut self, timestamp: i64) -> Self {
        self.terms.starts_at = Some(timestamp);
        self
    }

    pub fn with_usage(mut self, limit: u32, used: u32) -> Self {
        self.terms.usage_limit = Some(limit);
        self.terms.usage_count = used;
        self
    }

    pub fn matches_code(&self, code: &str) -> bool {
        normalize_code(&self.code) == normalize_code(code)
    }

    /// Check the coupon itself: enabled, started, not expired, under its cap.
    pub fn check_validity(&self, at: i64) -> Result<(), CouponError> {
        let terms = &self.terms;
        if !terms.active || !terms.has_started(at) {
            return Err(CouponError::CouponInvalid);
        }
        if terms.is_expired(at) {
            return Err(CouponError::CouponExpired);
        }
        if terms.is_exhausted() {
            return Err(CouponError::CouponUsageExceeded);
        }
        Ok(())
    }

    /// Check the coupon against the cart. `basis` is the subtotal its
    /// minimums are compared to. The outer error is fatal.
    pub fn check_applicable(
        &self,
        lines: &[PricedLine],
        basis: Money,
    ) -> Result<Result<(), CouponError>, PricingError> {
        if self.terms.applies_to(lines, basis)? {
            Ok(Ok(()))
        } else {
            Ok(Err(CouponError::CouponNotApplicable))
        }
    }
}

/// Trim and upper-case a coupon code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
