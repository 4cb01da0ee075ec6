//! Discount terms shared by automatic rules and coupons.

use crate::cart::PricedLine;
use crate::error::PricingError;
use crate::ids::{CategoryId, ProductId, RuleId};
use crate::money::{Currency, Money, BASIS_POINTS_SCALE};
use serde::{Deserialize, Serialize};

/// Type of discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// Percentage off.
    Percentage,
    /// Fixed amount off.
    Fixed,
    /// Buy X get Y free.
    Bogo,
    /// Amount depends on the subtotal tier reached.
    Tiered,
    /// Waives shipping; removes nothing from the total.
    FreeShipping,
}

/// Value of a discount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountValue {
    /// `basis_points / 100` percent off, optionally capped.
    Percentage {
        basis_points: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_amount: Option<Money>,
    },
    /// Fixed amount off.
    Fixed { amount: Money },
    /// Every complete group of `buy + get` units of a line yields `get` free units.
    Bogo { buy: u32, get: u32 },
    /// Highest tier whose threshold the subtotal reaches.
    Tiered { tiers: Vec<Tier> },
    /// Free shipping.
    FreeShipping,
}

/// One step of a tiered discount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tier {
    /// Pre-discount subtotal needed to reach this tier.
    pub min_subtotal: Money,
    pub value: TierValue,
}

/// What a tier takes off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierValue {
    Percentage {
        basis_points: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_amount: Option<Money>,
    },
    Fixed { amount: Money },
}

impl DiscountValue {
    pub fn discount_type(&self) -> DiscountType {
        match self {
            DiscountValue::Percentage { .. } => DiscountType::Percentage,
            DiscountValue::Fixed { .. } => DiscountType::Fixed,
            DiscountValue::Bogo { .. } => DiscountType::Bogo,
            DiscountValue::Tiered { .. } => DiscountType::Tiered,
            DiscountValue::FreeShipping => DiscountType::FreeShipping,
        }
    }

    pub fn grants_free_shipping(&self) -> bool {
        matches!(self, DiscountValue::FreeShipping)
    }
}

/// Which lines a discount is computed over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountScope {
    /// The whole cart.
    #[default]
    Cart,
    /// Lines for these products only.
    Products { product_ids: Vec<ProductId> },
    /// Lines whose product is in one of these categories.
    Categories { category_ids: Vec<CategoryId> },
}

impl DiscountScope {
    pub fn includes(&self, line: &PricedLine) -> bool {
        match self {
            DiscountScope::Cart => true,
            DiscountScope::Products { product_ids } => product_ids.contains(&line.product_id),
            DiscountScope::Categories { category_ids } => {
                line.category_ids.iter().any(|c| category_ids.contains(c))
            }
        }
    }
}

/// Condition for a discount to apply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountCondition {
    /// Minimum subtotal.
    MinimumSubtotal(Money),
    /// Minimum number of units in the cart.
    MinimumQuantity(i64),
    /// At least one of these products must be in the cart.
    ProductInCart(Vec<ProductId>),
    /// At least one product from these categories must be in the cart.
    CategoryInCart(Vec<CategoryId>),
    /// None of these products may be in the cart.
    ExcludedProducts(Vec<ProductId>),
}

impl DiscountCondition {
    /// Check the condition. `basis` is the subtotal minimums compare against.
    pub fn is_met(&self, lines: &[PricedLine], basis: Money) -> Result<bool, PricingError> {
        Ok(match self {
            DiscountCondition::MinimumSubtotal(min) => {
                ensure_currency(basis.currency, min)?;
                basis.amount_minor >= min.amount_minor
            }
            DiscountCondition::MinimumQuantity(min) => {
                lines.iter().map(|l| l.quantity).sum::<i64>() >= *min
            }
            DiscountCondition::ProductInCart(ids) => {
                lines.iter().any(|l| ids.contains(&l.product_id))
            }
            DiscountCondition::CategoryInCart(ids) => lines
                .iter()
                .any(|l| l.category_ids.iter().any(|c| ids.contains(c))),
            DiscountCondition::ExcludedProducts(ids) => {
                !lines.iter().any(|l| ids.contains(&l.product_id))
            }
        })
    }
}

/// Terms common to automatic rules and coupons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscountTerms {
    pub value: DiscountValue,
    #[serde(default)]
    pub scope: DiscountScope,
    #[serde(default)]
    pub conditions: Vec<DiscountCondition>,
    /// Disabled terms never apply.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Start of the active window (Unix seconds, inclusive).
    #[serde(default)]
    pub starts_at: Option<i64>,
    /// End of the active window (Unix seconds, inclusive).
    #[serde(default)]
    pub ends_at: Option<i64>,
    /// Maximum number of uses (None = unlimited).
    #[serde(default)]
    pub usage_limit: Option<u32>,
    /// Uses so far.
    #[serde(default)]
    pub usage_count: u32,
}

fn default_true() -> bool {
    true
}

impl DiscountTerms {
    pub fn new(value: DiscountValue) -> Self {
        Self {
            value,
            scope: DiscountScope::Cart,
            conditions: Vec::new(),
            active: true,
            starts_at: None,
            ends_at: None,
            usage_limit: None,
            usage_count: 0,
        }
    }

    pub fn has_started(&self, at: i64) -> bool {
        self.starts_at.map_or(true, |starts| at >= starts)
    }

    pub fn is_expired(&self, at: i64) -> bool {
        self.ends_at.is_some_and(|ends| at > ends)
    }

    pub fn is_exhausted(&self) -> bool {
        self.usage_limit
            .is_some_and(|limit| self.usage_count >= limit)
    }

    /// Active, inside its window and under its usage cap.
    pub fn is_live(&self, at: i64) -> bool {
        self.active && self.has_started(at) && !self.is_expired(at) && !self.is_exhausted()
    }

    /// All conditions hold and the scope matches at least one line.
    pub fn applies_to(&self, lines: &[PricedLine], basis: Money) -> Result<bool, PricingError> {
        for condition in &self.conditions {
            if !condition.is_met(lines, basis)? {
                return Ok(false);
            }
        }
        Ok(lines.iter().any(|l| self.scope.includes(l)))
    }

    /// Reject values no store should be able to configure.
    ///
    /// `owner` names the rule or coupon in the error.
    pub fn validate(&self, owner: &str) -> Result<(), PricingError> {
        let invalid = |reason: String| PricingError::InvalidDiscount {
            discount: owner.to_string(),
            reason,
        };
        let check_bps = |bps: u32| {
            if bps > BASIS_POINTS_SCALE {
                return Err(invalid(format!(
                    "{} basis points is more than 100%",
                    bps
                )));
            }
            Ok(())
        };
        let check_amount = |amount: &Money, what: &str| {
            if amount.is_negative() {
                return Err(invalid(format!("{} is negative", what)));
            }
            Ok(())
        };

        match &self.value {
            DiscountValue::Percentage {
                basis_points,
                max_amount,
            } => {
                check_bps(*basis_points)?;
                if let Some(cap) = max_amount {
                    check_amount(cap, "cap")?;
                }
            }
            DiscountValue::Fixed { amount } => check_amount(amount, "amount")?,
            DiscountValue::Tiered { tiers } => {
                for tier in tiers {
                    match &tier.value {
                        TierValue::Percentage {
                            basis_points,
                            max_amount,
                        } => {
                            check_bps(*basis_points)?;
                            if let Some(cap) = max_amount {
                                check_amount(cap, "tier cap")?;
                            }
                        }
                        TierValue::Fixed { amount } => check_amount(amount, "tier amount")?,
                    }
                }
            }
            DiscountValue::Bogo { .. } | DiscountValue::FreeShipping => {}
        }
        Ok(())
    }

    /// Amount these terms remove from `running`.
    ///
    /// Never more than the in-scope part of `running`, never negative.
    /// `subtotal` is the pre-discount subtotal, used only to pick a tier.
    pub fn amount(
        &self,
        lines: &[PricedLine],
        subtotal: Money,
        running: Money,
    ) -> Result<Money, PricingError> {
        let currency = running.currency;
        let base = match self.scope {
            DiscountScope::Cart => running,
            _ => {
                let eligible = Money::try_sum(
                    lines
                        .iter()
                        .filter(|l| self.scope.includes(l))
                        .map(|l| &l.line_total),
                    currency,
                )
                .ok_or_else(|| PricingError::overflow("eligible subtotal"))?;
                eligible.min(running)
            }
        };

        let amount = match &self.value {
            DiscountValue::Percentage {
                basis_points,
                max_amount,
            } => percentage(base, *basis_points, max_amount.as_ref())?,
            DiscountValue::Fixed { amount } => fixed(base, amount)?,
            DiscountValue::Bogo { buy, get } => {
                let free = bogo_value(lines, &self.scope, *buy, *get, currency)?;
                free.min(base)
            }
            DiscountValue::Tiered { tiers } => match reached_tier(tiers, subtotal)? {
                Some(Tier {
                    value:
                        TierValue::Percentage {
                            basis_points,
                            max_amount,
                        },
                    ..
                }) => percentage(base, *basis_points, max_amount.as_ref())?,
                Some(Tier {
                    value: TierValue::Fixed { amount },
                    ..
                }) => fixed(base, amount)?,
                None => Money::zero(currency),
            },
            DiscountValue::FreeShipping => Money::zero(currency),
        };

        Ok(amount.min(base).min(running).non_negative())
    }
}

fn ensure_currency(expected: Currency, got: &Money) -> Result<(), PricingError> {
    if got.currency != expected {
        return Err(PricingError::CurrencyMismatch {
            expected: expected.code().to_string(),
            got: got.currency.code().to_string(),
        });
    }
    Ok(())
}

fn percentage(base: Money, basis_points: u32, cap: Option<&Money>) -> Result<Money, PricingError> {
    let amount = base.percentage_bps(basis_points);
    match cap {
        Some(cap) => {
            ensure_currency(base.currency, cap)?;
            Ok(amount.min(*cap))
        }
        None => Ok(amount),
    }
}

fn fixed(base: Money, amount: &Money) -> Result<Money, PricingError> {
    ensure_currency(base.currency, amount)?;
    Ok(amount.min(base))
}

fn bogo_value(
    lines: &[PricedLine],
    scope: &DiscountScope,
    buy: u32,
    get: u32,
    currency: Currency,
) -> Result<Money, PricingError> {
    let group = i64::from(buy) + i64::from(get);
    if get == 0 || group == 0 {
        return Ok(Money::zero(currency));
    }

    let mut free = Money::zero(currency);
    for line in lines.iter().filter(|l| scope.includes(l)) {
        let free_units = (line.quantity / group) * i64::from(get);
        let value = line
            .unit_price
            .try_multiply(free_units)
            .ok_or_else(|| PricingError::overflow("BOGO value"))?;
        free = free
            .try_add(&value)
            .ok_or_else(|| PricingError::overflow("BOGO value"))?;
    }
    Ok(free)
}

fn reached_tier(tiers: &[Tier], subtotal: Money) -> Result<Option<&Tier>, PricingError> {
    let mut reached: Option<&Tier> = None;
    for tier in tiers {
        ensure_currency(subtotal.currency, &tier.min_subtotal)?;
        if subtotal.amount_minor < tier.min_subtotal.amount_minor {
            continue;
        }
        if reached.map_or(true, |r| tier.min_subtotal.amount_minor >= r.min_subtotal.amount_minor) {
            reached = Some(tier);
        }
    }
    Ok(reached)
}

/// A store-configured discount applied without a code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscountRule {
    pub id: RuleId,
    pub name: String,
    /// Higher priorities are evaluated first.
    #[serde(default)]
    pub priority: i32,
    /// Creation time (Unix seconds); breaks priority ties, earlier first.
    #[serde(default)]
    pub created_at: i64,
    /// Whether the rule still applies when a coupon is used.
    #[serde(default = "default_true")]
    pub stacks_with_coupon: bool,
    #[serde(flatten)]
    pub terms: DiscountTerms,
}

impl DiscountRule {
    /// Create a rule from its value.
    pub fn new(id: impl Into<RuleId>, name: impl Into<String>, value: DiscountValue) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority: 0,
            created_at: 0,
            stacks_with_coupon: true,
            terms: DiscountTerms::new(value),
        }
    }

    /// Create a percentage rule.
    pub fn percentage(id: impl Into<RuleId>, name: impl Into<String>, basis_points: u32) -> Self {
        Self::new(
            id,
            name,
            DiscountValue::Percentage {
                basis_points,
                max_amount: None,
            },
        )
    }

    /// Create a fixed amount rule.
    pub fn fixed_amount(id: impl Into<RuleId>, name: impl Into<String>, amount: Money) -> Self {
        Self::new(id, name, DiscountValue::Fixed { amount })
    }

    /// Create a free shipping rule.
    pub fn free_shipping(id: impl Into<RuleId>, name: impl Into<String>) -> Self {
        Self::new(id, name, DiscountValue::FreeShipping)
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn created(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_scope(mut self, scope: DiscountScope) -> Self {
        self.terms.scope = scope;
        self
    }

    pub fn with_condition(mut self, condition: DiscountCondition) -> Self {
        self.terms.conditions.push(condition);
        self
    }

    pub fn with_window(mut self, starts_at: Option<i64>, ends_at: Option<i64>) -> Self {
        self.terms.starts_at = starts_at;
        self.terms.ends_at = ends_at;
        self
    }

    pub fn with_usage_limit(mut self, limit: u32) -> Self {
        self.terms.usage_limit = Some(limit);
        self
    }

    /// Rule is dropped when a coupon is applied.
    pub fn exclusive_of_coupons(mut self) -> Self {
        self.stacks_with_coupon = false;
        self
    }

    pub fn discount_type(&self) -> DiscountType {
        self.terms.value.discount_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ils(minor: i64) -> Money {
        Money::new(minor, Currency::ILS)
    }

    fn line(product: &str, qty: i64, unit: i64, category: Option<&str>) -> PricedLine {
        PricedLine::new(
            ProductId::new(product),
            None,
            qty,
            ils(unit),
            category.map(CategoryId::new).into_iter().collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_percentage_with_cap() {
        let lines = vec![line("a", 1, 100_000, None)];
        let mut rule = DiscountRule::percentage("r", "20% up to 50", 2000);
        rule.terms.value = DiscountValue::Percentage {
            basis_points: 2000,
            max_amount: Some(ils(5000)),
        };
        let amount = rule.terms.amount(&lines, ils(100_000), ils(100_000)).unwrap();
        assert_eq!(amount.amount_minor, 5000);
    }

    #[test]
    fn test_fixed_capped_at_running_total() {
        let lines = vec![line("a", 1, 5000, None)];
        let rule = DiscountRule::fixed_amount("r", "100 off", ils(10_000));
        let amount = rule.terms.amount(&lines, ils(5000), ils(3000)).unwrap();
        assert_eq!(amount.amount_minor, 3000);
    }

    #[test]
    fn test_fixed_currency_mismatch_is_fatal() {
        let lines = vec![line("a", 1, 5000, None)];
        let rule = DiscountRule::fixed_amount("r", "5 off", Money::new(500, Currency::USD));
        assert!(matches!(
            rule.terms.amount(&lines, ils(5000), ils(5000)),
            Err(PricingError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_scoped_percentage_uses_eligible_lines() {
        let lines = vec![
            line("shirt", 2, 5000, Some("apparel")),
            line("mug", 1, 2000, Some("kitchen")),
        ];
        let rule = DiscountRule::percentage("r", "10% apparel", 1000).with_scope(
            DiscountScope::Categories {
                category_ids: vec![CategoryId::new("apparel")],
            },
        );
        let amount = rule.terms.amount(&lines, ils(12_000), ils(12_000)).unwrap();
        assert_eq!(amount.amount_minor, 1000);
    }

    #[test]
    fn test_bogo_groups() {
        let lines = vec![line("sock", 5, 1000, None), line("hat", 1, 3000, None)];
        let rule = DiscountRule::new("r", "buy 1 get 1", DiscountValue::Bogo { buy: 1, get: 1 });
        // socks: 5 / 2 = 2 groups -> 2 free; hat: 0 groups
        let amount = rule.terms.amount(&lines, ils(8000), ils(8000)).unwrap();
        assert_eq!(amount.amount_minor, 2000);

        let scoped = rule.with_scope(DiscountScope::Products {
            product_ids: vec![ProductId::new("hat")],
        });
        let amount = scoped.terms.amount(&lines, ils(8000), ils(8000)).unwrap();
        assert!(amount.is_zero());
    }

    #[test]
    fn test_tiered_picks_highest_reached() {
        let lines = vec![line("a", 1, 30_000, None)];
        let rule = DiscountRule::new(
            "r",
            "tiers",
            DiscountValue::Tiered {
                tiers: vec![
                    Tier {
                        min_subtotal: ils(10_000),
                        value: TierValue::Fixed { amount: ils(1000) },
                    },
                    Tier {
                        min_subtotal: ils(25_000),
                        value: TierValue::Percentage {
                            basis_points: 1000,
                            max_amount: None,
                        },
                    },
                    Tier {
                        min_subtotal: ils(50_000),
                        value: TierValue::Fixed { amount: ils(9000) },
                    },
                ],
            },
        );
        let amount = rule.terms.amount(&lines, ils(30_000), ils(30_000)).unwrap();
        assert_eq!(amount.amount_minor, 3000);

        let amount = rule.terms.amount(&lines, ils(5000), ils(5000)).unwrap();
        assert!(amount.is_zero());
    }

    #[test]
    fn test_conditions() {
        let lines = vec![line("shirt", 2, 5000, Some("apparel"))];
        let basis = ils(10_000);
        let met = |c: DiscountCondition| c.is_met(&lines, basis).unwrap();
        assert!(met(DiscountCondition::MinimumSubtotal(ils(10_000))));
        assert!(!met(DiscountCondition::MinimumSubtotal(ils(10_001))));
        assert!(met(DiscountCondition::MinimumQuantity(2)));
        assert!(!met(DiscountCondition::MinimumQuantity(3)));
        assert!(met(DiscountCondition::CategoryInCart(vec![CategoryId::new("apparel")])));
        assert!(!met(DiscountCondition::ExcludedProducts(vec![ProductId::new("shirt")])));
    }

    #[test]
    fn test_minimum_subtotal_in_other_currency() {
        let lines = vec![line("shirt", 2, 5000, None)];
        let usd = DiscountCondition::MinimumSubtotal(Money::new(100, Currency::USD));
        assert!(matches!(
            usd.is_met(&lines, ils(10_000)),
            Err(PricingError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_tier_in_other_currency() {
        let lines = vec![line("a", 1, 30_000, None)];
        let rule = DiscountRule::new(
            "r",
            "tiers",
            DiscountValue::Tiered {
                tiers: vec![Tier {
                    min_subtotal: Money::new(100, Currency::USD),
                    value: TierValue::Fixed { amount: ils(1000) },
                }],
            },
        );
        assert!(matches!(
            rule.terms.amount(&lines, ils(30_000), ils(30_000)),
            Err(PricingError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_scoped_percentage_stays_in_scope() {
        let lines = vec![
            line("cap", 1, 5000, Some("hats")),
            line("coat", 1, 7000, None),
        ];
        let hats = DiscountScope::Categories {
            category_ids: vec![CategoryId::new("hats")],
        };
        let rule = DiscountRule::percentage("r", "all hats free", 10_000).with_scope(hats.clone());
        let amount = rule.terms.amount(&lines, ils(12_000), ils(12_000)).unwrap();
        assert_eq!(amount.amount_minor, 5000);

        let rule = DiscountRule::percentage("r", "150% off hats", 15_000).with_scope(hats);
        let amount = rule.terms.amount(&lines, ils(12_000), ils(12_000)).unwrap();
        assert_eq!(amount.amount_minor, 5000);
    }

    #[test]
    fn test_validate_rejects_over_full_percentage() {
        let rule = DiscountRule::percentage("r", "150% off", 15_000);
        assert!(matches!(
            rule.terms.validate("r"),
            Err(PricingError::InvalidDiscount { .. })
        ));
        assert!(DiscountRule::percentage("r", "all free", 10_000).terms.validate("r").is_ok());

        let tiered = DiscountRule::new(
            "t",
            "tiers",
            DiscountValue::Tiered {
                tiers: vec![Tier {
                    min_subtotal: ils(0),
                    value: TierValue::Percentage {
                        basis_points: 10_001,
                        max_amount: None,
                    },
                }],
            },
        );
        assert!(tiered.terms.validate("t").is_err());

        let negative = DiscountRule::fixed_amount("f", "negative", ils(-100));
        assert!(negative.terms.validate("f").is_err());
    }

    #[test]
    fn test_window_and_usage() {
        let rule = DiscountRule::percentage("r", "r", 1000)
            .with_window(Some(100), Some(200))
            .with_usage_limit(2);
        assert!(!rule.terms.is_live(99));
        assert!(rule.terms.is_live(100));
        assert!(rule.terms.is_live(200));
        assert!(!rule.terms.is_live(201));

        let mut used = rule.clone();
        used.terms.usage_count = 2;
        assert!(!used.terms.is_live(150));
    }

    #[test]
    fn test_rule_json_shape() {
        let json = r#"{
            "id": "summer",
            "name": "Summer 10%",
            "priority": 5,
            "value": { "type": "PERCENTAGE", "basis_points": 1000 },
            "conditions": [
                { "kind": "MINIMUM_SUBTOTAL", "value": { "amount_minor": 10000, "currency": "ILS" } }
            ]
        }"#;
        let rule: DiscountRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.discount_type(), DiscountType::Percentage);
        assert!(rule.stacks_with_coupon);
        assert!(rule.terms.active);
        assert_eq!(rule.terms.scope, DiscountScope::Cart);
    }
}
