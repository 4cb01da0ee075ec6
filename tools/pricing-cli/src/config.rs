//! CLI configuration.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use storefront_pricing::pricing::ShippingPolicy;
use storefront_pricing::service::EngineConfig;
use storefront_pricing::{Currency, Money};

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Default store fixture (JSON).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<String>,

    /// Engine policies.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Shipping defaults for every store.
    #[serde(default)]
    pub shipping: ShippingConfig,

    /// Per-store shipping overrides, keyed by store slug or id.
    #[serde(default)]
    pub stores: BTreeMap<String, StoreOverride>,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Shipping policy for a store: defaults with that store's overrides applied.
    pub fn shipping_for(&self, store: &str) -> Result<ShippingPolicy> {
        let base = self.shipping.policy()?;
        match self.stores.get(store) {
            Some(over) => over.apply(base, self.shipping.currency()?),
            None => Ok(base),
        }
    }
}

/// Shipping defaults. Amounts are decimal strings in major units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingConfig {
    /// Threshold for free shipping; "none" disables it.
    #[serde(default = "default_threshold")]
    pub free_shipping_threshold: String,

    /// Flat rate below the threshold.
    #[serde(default = "default_flat_rate")]
    pub flat_rate: String,

    /// ISO currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_threshold() -> String {
    "200.00".to_string()
}

fn default_flat_rate() -> String {
    "25.00".to_string()
}

fn default_currency() -> String {
    "ILS".to_string()
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: default_threshold(),
            flat_rate: default_flat_rate(),
            currency: default_currency(),
        }
    }
}

impl ShippingConfig {
    pub fn currency(&self) -> Result<Currency> {
        Currency::from_code(&self.currency)
            .ok_or_else(|| anyhow!("Unknown currency: {}", self.currency))
    }

    pub fn policy(&self) -> Result<ShippingPolicy> {
        let currency = self.currency()?;
        let policy = ShippingPolicy::new(
            parse_threshold(&self.free_shipping_threshold, currency)?,
            parse_amount("shipping.flat_rate", &self.flat_rate, currency)?,
        );
        policy.validate()?;
        Ok(policy)
    }
}

/// Per-store shipping override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_shipping_threshold: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat_rate: Option<String>,
}

impl StoreOverride {
    fn apply(&self, mut base: ShippingPolicy, currency: Currency) -> Result<ShippingPolicy> {
        if let Some(threshold) = &self.free_shipping_threshold {
            base.free_shipping_threshold = parse_threshold(threshold, currency)?;
        }
        if let Some(rate) = &self.flat_rate {
            base.flat_rate = parse_amount("flat_rate", rate, currency)?;
        }
        base.validate()?;
        Ok(base)
    }

    pub fn is_empty(&self) -> bool {
        self.free_shipping_threshold.is_none() && self.flat_rate.is_none()
    }
}

fn parse_threshold(value: &str, currency: Currency) -> Result<Option<Money>> {
    if value.trim().eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    parse_amount("free_shipping_threshold", value, currency).map(Some)
}

/// Parse a decimal amount like "180.00".
pub fn parse_amount(field: &str, value: &str, currency: Currency) -> Result<Money> {
    match Money::parse_decimal(value, currency) {
        Some(money) => Ok(money),
        None => bail!("{}: '{}' is not a valid amount", field, value),
    }
}

/// Generate a default pricing.toml config file.
pub fn generate_default_config(fixture: Option<&str>) -> String {
    let fixture_line = match fixture {
        Some(path) => format!("fixture = \"{}\"\n", path),
        None => "# fixture = \"fixtures/store.json\"\n".to_string(),
    };
    format!(
        r#"# Storefront pricing configuration
{fixture_line}
[engine]
# "unconstrained": untracked bundle components never limit availability
# "raw-quantity": read their stock figure anyway
untracked_inventory = "unconstrained"
# "pre-discount" or "post-automatic"
coupon_basis = "pre-discount"

[shipping]
free_shipping_threshold = "200.00"
flat_rate = "25.00"
currency = "ILS"

# [stores.my-store]
# free_shipping_threshold = "150.00"
# flat_rate = "15.00"
"#,
        fixture_line = fixture_line
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_pricing::catalog::UntrackedInventory;
    use storefront_pricing::discount::CouponBasis;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        let policy = config.shipping_for("anything").unwrap();
        assert_eq!(policy.free_shipping_threshold, Some(Money::new(20_000, Currency::ILS)));
        assert_eq!(policy.flat_rate, Money::new(2_500, Currency::ILS));
        assert_eq!(config.engine.untracked_inventory, UntrackedInventory::Unconstrained);
    }

    #[test]
    fn test_generated_config_parses() {
        let config: CliConfig = toml::from_str(&generate_default_config(Some("store.json"))).unwrap();
        assert_eq!(config.fixture.as_deref(), Some("store.json"));
        assert_eq!(config.engine.coupon_basis, CouponBasis::PreDiscount);
    }

    #[test]
    fn test_store_override() {
        let config: CliConfig = toml::from_str(
            r#"
[engine]
untracked_inventory = "raw-quantity"
coupon_basis = "post-automatic"

[shipping]
flat_rate = "30"

[stores.demo]
free_shipping_threshold = "none"
flat_rate = "12.50"
"#,
        )
        .unwrap();
        assert_eq!(config.engine.untracked_inventory, UntrackedInventory::RawQuantity);
        assert_eq!(config.engine.coupon_basis, CouponBasis::PostAutomatic);

        let base = config.shipping_for("other").unwrap();
        assert_eq!(base.flat_rate, Money::new(3_000, Currency::ILS));

        let demo = config.shipping_for("demo").unwrap();
        assert_eq!(demo.free_shipping_threshold, None);
        assert_eq!(demo.flat_rate, Money::new(1_250, Currency::ILS));
    }

    #[test]
    fn test_bad_amount_rejected() {
        let config = CliConfig {
            shipping: ShippingConfig {
                flat_rate: "abc".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.shipping_for("x").is_err());
    }
}
