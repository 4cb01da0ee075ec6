//! Threshold-based shipping.

use crate::error::PricingError;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Per-store shipping settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingPolicy {
    /// Discounted total at or above which shipping is free. None = never free.
    pub free_shipping_threshold: Option<Money>,
    /// Charged when the threshold is not met.
    pub flat_rate: Money,
}

impl ShippingPolicy {
    pub fn new(free_shipping_threshold: Option<Money>, flat_rate: Money) -> Self {
        Self {
            free_shipping_threshold,
            flat_rate,
        }
    }

    /// Flat rate only.
    pub fn flat(flat_rate: Money) -> Self {
        Self::new(None, flat_rate)
    }

    /// Never charge shipping.
    pub fn free(currency: Currency) -> Self {
        Self::new(None, Money::zero(currency))
    }

    pub fn currency(&self) -> Currency {
        self.flat_rate.currency
    }

    /// Reject negative amounts and mixed currencies.
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.flat_rate.is_negative() {
            return Err(PricingError::ArithmeticInvariantViolation(format!(
                "negative flat shipping rate {}",
                self.flat_rate
            )));
        }
        if let Some(threshold) = self.free_shipping_threshold {
            if threshold.currency != self.flat_rate.currency {
                return Err(PricingError::CurrencyMismatch {
                    expected: self.flat_rate.currency.code().to_string(),
                    got: threshold.currency.code().to_string(),
                });
            }
            if threshold.is_negative() {
                return Err(PricingError::ArithmeticInvariantViolation(format!(
                    "negative free shipping threshold {}",
                    threshold
                )));
            }
        }
        Ok(())
    }

    /// Whether `total` meets the free shipping threshold.
    pub fn threshold_met(&self, total: Money) -> bool {
        self.free_shipping_threshold
            .is_some_and(|threshold| total.amount_minor >= threshold.amount_minor)
    }

    /// Shipping for a cart with the given discounted total.
    pub fn cost_for(&self, total: Money, waived: bool) -> Money {
        if waived || self.threshold_met(total) {
            Money::zero(self.currency())
        } else {
            self.flat_rate
        }
    }

    /// How much more must be spent to reach free shipping.
    pub fn remaining_for_free(&self, total: Money, waived: bool) -> Option<Money> {
        let threshold = self.free_shipping_threshold?;
        if waived {
            return Some(Money::zero(threshold.currency));
        }
        Some(
            Money::new(
                threshold.amount_minor.saturating_sub(total.amount_minor),
                threshold.currency,
            )
            .non_negative(),
        )
    }
}

impl Default for ShippingPolicy {
    /// 200.00 threshold, 25.00 flat rate, ILS.
    fn default() -> Self {
        Self::new(
            Some(Money::new(20_000, Currency::ILS)),
            Money::new(2_500, Currency::ILS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ils(minor: i64) -> Money {
        Money::new(minor, Currency::ILS)
    }

    #[test]
    fn test_threshold_inclusive() {
        let policy = ShippingPolicy::new(Some(ils(20_000)), ils(1_500));
        assert_eq!(policy.cost_for(ils(19_999), false), ils(1_500));
        assert!(policy.cost_for(ils(20_000), false).is_zero());
    }

    #[test]
    fn test_waived_and_zero_total() {
        let policy = ShippingPolicy::new(Some(ils(20_000)), ils(1_500));
        assert!(policy.cost_for(ils(100), true).is_zero());
        assert_eq!(policy.cost_for(ils(0), false), ils(1_500));
        assert_eq!(policy.cost_for(ils(100), false), ils(1_500));
    }

    #[test]
    fn test_remaining_for_free() {
        let policy = ShippingPolicy::default();
        assert_eq!(policy.remaining_for_free(ils(16_200), false), Some(ils(3_800)));
        assert_eq!(policy.remaining_for_free(ils(25_000), false), Some(ils(0)));
        assert_eq!(ShippingPolicy::flat(ils(10)).remaining_for_free(ils(0), false), None);
    }

    #[test]
    fn test_validate() {
        assert!(ShippingPolicy::default().validate().is_ok());
        assert!(ShippingPolicy::flat(ils(-1)).validate().is_err());
        let mixed = ShippingPolicy::new(Some(Money::new(100, Currency::USD)), ils(10));
        assert!(matches!(
            mixed.validate(),
            Err(PricingError::CurrencyMismatch { .. })
        ));
    }
}
