//! Sequential discount evaluation.
//!
//! Automatic rules are applied one after another against a running total,
//! then at most one coupon on top. Every amount is clamped so the running
//! total never goes below zero.

use super::coupon::Coupon;
use super::rule::{DiscountRule, DiscountTerms, DiscountType};
use crate::cart::PricedLine;
use crate::error::{CouponError, PricingError};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Which subtotal a coupon's conditions are checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CouponBasis {
    /// Pre-discount subtotal.
    #[default]
    PreDiscount,
    /// Running total after the automatic rules that stack with coupons.
    PostAutomatic,
}

/// Where an applied discount came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountOrigin {
    Automatic,
    Coupon,
}

/// A discount that has been applied to a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedDiscount {
    /// Rule or coupon id.
    pub rule_id: String,
    /// Name for display.
    pub name: String,
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    /// Exact amount removed from the running total.
    pub amount: Money,
    pub origin: DiscountOrigin,
}

/// Everything the engine needs for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct DiscountInput<'a> {
    pub currency: Currency,
    pub lines: &'a [PricedLine],
    pub rules: &'a [DiscountRule],
    /// Code supplied by the shopper, if any.
    pub coupon_code: Option<&'a str>,
    /// Coupon the store returned for that code, if it exists.
    pub coupon: Option<&'a Coupon>,
    /// Single evaluation time for every window check (Unix seconds).
    pub evaluated_at: i64,
}

/// Output of an evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscountResult {
    pub subtotal: Money,
    pub applied_discounts: Vec<AppliedDiscount>,
    /// Normalized code of the coupon that was applied.
    pub coupon_applied: Option<String>,
    /// Why the supplied coupon was not applied.
    pub coupon_error: Option<CouponError>,
    pub total: Money,
    pub savings: Money,
    /// A free shipping discount was applied.
    pub free_shipping: bool,
}

/// Evaluates automatic rules and a coupon against priced lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscountEngine {
    coupon_basis: CouponBasis,
}

impl DiscountEngine {
    pub fn new(coupon_basis: CouponBasis) -> Self {
        Self { coupon_basis }
    }

    pub fn coupon_basis(&self) -> CouponBasis {
        self.coupon_basis
    }

    /// Evaluate discounts. Coupon failures land in the result; only
    /// arithmetic and currency defects are returned as errors.
    pub fn evaluate(&self, input: DiscountInput<'_>) -> Result<DiscountResult, PricingError> {
        let subtotal = subtotal_of(input.lines, input.currency)?;

        let mut selected: Vec<&DiscountRule> = Vec::new();
        for rule in input.rules.iter().filter(|r| r.terms.is_live(input.evaluated_at)) {
            if rule.terms.applies_to(input.lines, subtotal)? {
                selected.push(rule);
            }
        }
        selected.sort_by(|a, b| evaluation_order(a, b));

        let stacking: Vec<&DiscountRule> = selected
            .iter()
            .copied()
            .filter(|r| r.stacks_with_coupon)
            .collect();

        let coupon = match input.coupon_code {
            Some(code) => Some(self.check_coupon(&input, code, subtotal, &stacking)?),
            None => None,
        };

        let automatic = match coupon {
            Some(Ok(_)) => &stacking,
            _ => &selected,
        };

        let mut ledger = Ledger::new(subtotal);
        for rule in automatic {
            ledger.apply(
                input.lines,
                rule.id.as_str(),
                &rule.name,
                &rule.terms,
                DiscountOrigin::Automatic,
            )?;
        }

        let (coupon_applied, coupon_error) = match coupon {
            Some(Ok(coupon)) => {
                ledger.apply(
                    input.lines,
                    coupon.id.as_str(),
                    &coupon.name,
                    &coupon.terms,
                    DiscountOrigin::Coupon,
                )?;
                (Some(super::normalize_code(&coupon.code)), None)
            }
            Some(Err(error)) => (None, Some(error)),
            None => (None, None),
        };

        ledger.finish(coupon_applied, coupon_error)
    }

    fn check_coupon<'a>(
        &self,
        input: &DiscountInput<'a>,
        code: &str,
        subtotal: Money,
        stacking: &[&DiscountRule],
    ) -> Result<Result<&'a Coupon, CouponError>, PricingError> {
        let coupon = match input.coupon.filter(|c| c.matches_code(code)) {
            Some(coupon) => coupon,
            None => {
                warn!(code, "coupon not found");
                return Ok(Err(CouponError::CouponInvalid));
            }
        };

        if let Err(error) = coupon.check_validity(input.evaluated_at) {
            warn!(code, %error, "coupon rejected");
            return Ok(Err(error));
        }

        let basis = match self.coupon_basis {
            CouponBasis::PreDiscount => subtotal,
            CouponBasis::PostAutomatic => {
                let mut scratch = Ledger::new(subtotal);
                for rule in stacking {
                    scratch.apply(
                        input.lines,
                        rule.id.as_str(),
                        &rule.name,
                        &rule.terms,
                        DiscountOrigin::Automatic,
                    )?;
                }
                scratch.running
            }
        };

        match coupon.check_applicable(input.lines, basis)? {
            Ok(()) => Ok(Ok(coupon)),
            Err(error) => {
                warn!(code, %error, basis = %basis, "coupon rejected");
                Ok(Err(error))
            }
        }
    }
}

/// Higher priority first, then earlier creation, then id.
fn evaluation_order(a: &DiscountRule, b: &DiscountRule) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then(a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

fn subtotal_of(lines: &[PricedLine], currency: Currency) -> Result<Money, PricingError> {
    if let Some(line) = lines.iter().find(|l| l.line_total.currency != currency) {
        return Err(PricingError::CurrencyMismatch {
            expected: currency.code().to_string(),
            got: line.line_total.currency.code().to_string(),
        });
    }
    Money::try_sum(lines.iter().map(|l| &l.line_total), currency)
        .ok_or_else(|| PricingError::overflow("subtotal"))
}

struct Ledger {
    subtotal: Money,
    running: Money,
    applied: Vec<AppliedDiscount>,
    free_shipping: bool,
}

impl Ledger {
    fn new(subtotal: Money) -> Self {
        Self {
            subtotal,
            running: subtotal,
            applied: Vec::new(),
            free_shipping: false,
        }
    }

    fn apply(
        &mut self,
        lines: &[PricedLine],
        id: &str,
        name: &str,
        terms: &DiscountTerms,
        origin: DiscountOrigin,
    ) -> Result<(), PricingError> {
        terms.validate(id)?;
        let amount = terms.amount(lines, self.subtotal, self.running)?;
        if amount.is_negative() || amount.amount_minor > self.running.amount_minor {
            return Err(PricingError::ArithmeticInvariantViolation(format!(
                "discount {} removes {} from running total {}",
                id, amount, self.running
            )));
        }

        // A valid coupon is always listed, even when nothing is left to take off.
        let waives_shipping = terms.value.grants_free_shipping();
        if amount.is_zero() && !waives_shipping && origin == DiscountOrigin::Automatic {
            debug!(rule = id, "discount removes nothing, skipped");
            return Ok(());
        }

        self.running = self
            .running
            .try_subtract(&amount)
            .ok_or_else(|| PricingError::overflow("running total"))?;
        self.free_shipping |= waives_shipping;

        debug!(
            rule = id,
            ?origin,
            amount = %amount,
            running = %self.running,
            "applied discount"
        );

        self.applied.push(AppliedDiscount {
            rule_id: id.to_string(),
            name: name.to_string(),
            discount_type: terms.value.discount_type(),
            amount,
            origin,
        });
        Ok(())
    }

    fn finish(
        self,
        coupon_applied: Option<String>,
        coupon_error: Option<CouponError>,
    ) -> Result<DiscountResult, PricingError> {
        let currency = self.subtotal.currency;
        let removed = Money::try_sum(self.applied.iter().map(|d| &d.amount), currency)
            .ok_or_else(|| PricingError::overflow("discount sum"))?;
        let unclamped = self
            .subtotal
            .try_subtract(&removed)
            .ok_or_else(|| PricingError::overflow("total"))?;
        if unclamped.is_negative() || unclamped != self.running {
            return Err(PricingError::ArithmeticInvariantViolation(format!(
                "subtotal {} minus discounts {} does not reconcile with running total {}",
                self.subtotal, removed, self.running
            )));
        }

        let total = unclamped.non_negative();
        let savings = self
            .subtotal
            .try_subtract(&total)
            .ok_or_else(|| PricingError::overflow("savings"))?;

        Ok(DiscountResult {
            subtotal: self.subtotal,
            applied_discounts: self.applied,
            coupon_applied,
            coupon_error,
            total,
            savings,
            free_shipping: self.free_shipping,
        })
    }
}
