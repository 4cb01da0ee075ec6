//! Bundle availability derived from component stock.
//!
//! Figures are estimates for "can this be added to the cart", not
//! reservations. Stock can change before the order commits.

use std::cmp::Ordering;
use std::fmt;

use crate::catalog::{BundleItem, CatalogSnapshot, Product, ProductType};
use crate::error::PricingError;
use crate::ids::VariantId;
use serde::{Deserialize, Serialize};

/// Sellable quantity of a product.
///
/// Ordered so that every `Finite` value is smaller than `Unlimited`; `min`
/// therefore lets any finite constraint win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "units", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    Finite(u64),
    Unlimited,
}

impl Availability {
    /// Nothing can be sold.
    pub const NONE: Availability = Availability::Finite(0);

    /// Availability from a raw stock figure. Negative stock counts as zero.
    pub fn from_stock(quantity: i64) -> Self {
        Availability::Finite(quantity.max(0) as u64)
    }

    /// Whole units obtainable when each unit consumes `per_unit`.
    pub fn units_of(self, per_unit: u32) -> Self {
        match self {
            Availability::Finite(n) => Availability::Finite(n / u64::from(per_unit.max(1))),
            Availability::Unlimited => Availability::Unlimited,
        }
    }

    /// Check whether `quantity` units fit.
    pub fn covers(self, quantity: u64) -> bool {
        match self {
            Availability::Finite(n) => quantity <= n,
            Availability::Unlimited => true,
        }
    }

    /// The finite figure, if any.
    pub fn as_finite(self) -> Option<u64> {
        match self {
            Availability::Finite(n) => Some(n),
            Availability::Unlimited => None,
        }
    }
}

impl Ord for Availability {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Availability::Finite(a), Availability::Finite(b)) => a.cmp(b),
            (Availability::Finite(_), Availability::Unlimited) => Ordering::Less,
            (Availability::Unlimited, Availability::Finite(_)) => Ordering::Greater,
            (Availability::Unlimited, Availability::Unlimited) => Ordering::Equal,
        }
    }
}

impl PartialOrd for Availability {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Finite(n) => write!(f, "{}", n),
            Availability::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// How a bundle component with `track_inventory = false` is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UntrackedInventory {
    /// The component never constrains the bundle.
    #[default]
    Unconstrained,
    /// Read the raw stock field regardless of the tracking flag.
    RawQuantity,
}

/// Derives sellable quantities from catalog stock.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvailabilityCalculator {
    untracked: UntrackedInventory,
}

impl AvailabilityCalculator {
    pub fn new(untracked: UntrackedInventory) -> Self {
        Self { untracked }
    }

    pub fn untracked_policy(&self) -> UntrackedInventory {
        self.untracked
    }

    /// Sellable bundles given current component stock.
    ///
    /// The minimum over required items of `floor(stock / item.quantity)`.
    /// Optional items never constrain. A bundle with no required items
    /// reports zero: it has no guaranteed composition.
    pub fn compute_bundle_availability(
        &self,
        bundle: &Product,
        components: &CatalogSnapshot,
    ) -> Result<Availability, PricingError> {
        if bundle.product_type != ProductType::Bundle {
            return Err(PricingError::InvalidBundleComposition {
                bundle: bundle.id.to_string(),
                reason: format!("product type is {}", bundle.product_type.as_str()),
            });
        }

        let mut required = bundle.required_items().peekable();
        if required.peek().is_none() {
            return Ok(Availability::NONE);
        }

        let mut availability = Availability::Unlimited;
        for item in required {
            if item.quantity == 0 {
                return Err(PricingError::InvalidBundleComposition {
                    bundle: bundle.id.to_string(),
                    reason: format!("component {} has quantity 0", item.product_id),
                });
            }
            let units = self.component_stock(item, components)?.units_of(item.quantity);
            tracing::trace!(
                bundle = %bundle.id,
                component = %item.product_id,
                units = %units,
                "bundle component"
            );
            availability = availability.min(units);
        }
        Ok(availability)
    }

    /// Stock of one bundle component.
    pub fn component_stock(
        &self,
        item: &BundleItem,
        components: &CatalogSnapshot,
    ) -> Result<Availability, PricingError> {
        let product = components.product(&item.product_id)?;
        let raw = match &item.variant_id {
            Some(vid) => {
                components
                    .variant_of(&item.product_id, vid)?
                    .inventory_quantity
            }
            None => product.inventory_quantity,
        };

        if !product.track_inventory && self.untracked == UntrackedInventory::Unconstrained {
            return Ok(Availability::Unlimited);
        }
        Ok(Availability::from_stock(raw))
    }

    /// Availability of whatever a cart line refers to.
    ///
    /// Bundles are derived; simple and variable products read stock directly,
    /// and untracked products are unlimited.
    pub fn line_availability(
        &self,
        product: &Product,
        variant_id: Option<&VariantId>,
        snapshot: &CatalogSnapshot,
    ) -> Result<Availability, PricingError> {
        if product.is_bundle() {
            return self.compute_bundle_availability(product, snapshot);
        }

        let raw = match variant_id {
            Some(vid) => snapshot.variant_of(&product.id, vid)?.inventory_quantity,
            None => product.inventory_quantity,
        };
        if !product.track_inventory {
            return Ok(Availability::Unlimited);
        }
        Ok(Availability::from_stock(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductVariant;
    use crate::ids::ProductId;
    use crate::money::{Currency, Money};

    fn price() -> Money {
        Money::new(1000, Currency::ILS)
    }

    fn components() -> CatalogSnapshot {
        CatalogSnapshot::new("shop", 1)
            .with_product(Product::variable("shirt", "Shirt", price()))
            .with_variant(ProductVariant::new("shirt-red-m", "shirt", "SH-R-M", 12))
            .with_product(Product::simple("cap", "Cap", price(), 25))
            .with_product(Product::simple("socks", "Socks", price(), 7))
            .with_product(Product::simple("sticker", "Sticker", price(), 3).untracked())
            .with_product(Product::simple("broken", "Broken", price(), -4))
    }

    #[test]
    fn test_availability_ordering() {
        assert!(Availability::Finite(1_000_000) < Availability::Unlimited);
        assert_eq!(
            Availability::Unlimited.min(Availability::Finite(3)),
            Availability::Finite(3)
        );
        assert_eq!(
            Availability::Finite(2).min(Availability::Finite(5)),
            Availability::Finite(2)
        );
        assert_eq!(
            Availability::Unlimited.min(Availability::Unlimited),
            Availability::Unlimited
        );
    }

    #[test]
    fn test_variant_and_product_components() {
        let bundle = Product::bundle(
            "kit",
            "Kit",
            price(),
            vec![
                BundleItem::required("shirt", 1).with_variant("shirt-red-m"),
                BundleItem::required("cap", 1),
            ],
        );
        let calc = AvailabilityCalculator::default();
        assert_eq!(
            calc.compute_bundle_availability(&bundle, &components()).unwrap(),
            Availability::Finite(12)
        );
    }

    #[test]
    fn test_quantity_divides_stock() {
        let bundle = Product::bundle(
            "pair-pack",
            "Pair pack",
            price(),
            vec![
                BundleItem::required("socks", 2),
                BundleItem::required("cap", 3),
            ],
        );
        // socks 7/2 = 3, cap 25/3 = 8
        let calc = AvailabilityCalculator::default();
        assert_eq!(
            calc.compute_bundle_availability(&bundle, &components()).unwrap(),
            Availability::Finite(3)
        );
    }

    #[test]
    fn test_optional_items_do_not_constrain() {
        let bundle = Product::bundle(
            "kit",
            "Kit",
            price(),
            vec![
                BundleItem::required("cap", 1),
                BundleItem::optional("socks", 100),
            ],
        );
        let calc = AvailabilityCalculator::default();
        assert_eq!(
            calc.compute_bundle_availability(&bundle, &components()).unwrap(),
            Availability::Finite(25)
        );
    }

    #[test]
    fn test_all_optional_bundle_is_zero() {
        let bundle = Product::bundle(
            "loose",
            "Loose",
            price(),
            vec![BundleItem::optional("cap", 1), BundleItem::optional("socks", 1)],
        );
        let calc = AvailabilityCalculator::default();
        assert_eq!(
            calc.compute_bundle_availability(&bundle, &components()).unwrap(),
            Availability::NONE
        );

        let empty = Product::bundle("empty", "Empty", price(), vec![]);
        assert_eq!(
            calc.compute_bundle_availability(&empty, &components()).unwrap(),
            Availability::NONE
        );
    }

    #[test]
    fn test_negative_stock_clamps_to_zero() {
        let bundle = Product::bundle(
            "kit",
            "Kit",
            price(),
            vec![BundleItem::required("broken", 1), BundleItem::required("cap", 1)],
        );
        let calc = AvailabilityCalculator::default();
        assert_eq!(
            calc.compute_bundle_availability(&bundle, &components()).unwrap(),
            Availability::NONE
        );
    }

    #[test]
    fn test_untracked_component_unconstrained() {
        let bundle = Product::bundle(
            "kit",
            "Kit",
            price(),
            vec![BundleItem::required("sticker", 1), BundleItem::required("socks", 1)],
        );
        let calc = AvailabilityCalculator::new(UntrackedInventory::Unconstrained);
        assert_eq!(
            calc.compute_bundle_availability(&bundle, &components()).unwrap(),
            Availability::Finite(7)
        );

        let only_untracked = Product::bundle(
            "stickers",
            "Stickers",
            price(),
            vec![BundleItem::required("sticker", 2)],
        );
        assert_eq!(
            calc.compute_bundle_availability(&only_untracked, &components())
                .unwrap(),
            Availability::Unlimited
        );
    }

    #[test]
    fn test_untracked_component_raw_quantity() {
        let bundle = Product::bundle(
            "kit",
            "Kit",
            price(),
            vec![BundleItem::required("sticker", 1), BundleItem::required("socks", 1)],
        );
        let calc = AvailabilityCalculator::new(UntrackedInventory::RawQuantity);
        assert_eq!(
            calc.compute_bundle_availability(&bundle, &components()).unwrap(),
            Availability::Finite(3)
        );
    }

    #[test]
    fn test_missing_component_is_fatal() {
        let bundle = Product::bundle(
            "kit",
            "Kit",
            price(),
            vec![BundleItem::required("ghost", 1)],
        );
        let calc = AvailabilityCalculator::default();
        assert!(matches!(
            calc.compute_bundle_availability(&bundle, &components()),
            Err(PricingError::CatalogLookupFailed { .. })
        ));

        let bad_variant = Product::bundle(
            "kit",
            "Kit",
            price(),
            vec![BundleItem::required("cap", 1).with_variant("shirt-red-m")],
        );
        assert!(matches!(
            calc.compute_bundle_availability(&bad_variant, &components()),
            Err(PricingError::CatalogLookupFailed { .. })
        ));
    }

    #[test]
    fn test_zero_quantity_component_rejected() {
        let bundle = Product::bundle("kit", "Kit", price(), vec![BundleItem::required("cap", 0)]);
        let calc = AvailabilityCalculator::default();
        assert!(matches!(
            calc.compute_bundle_availability(&bundle, &components()),
            Err(PricingError::InvalidBundleComposition { .. })
        ));
    }

    #[test]
    fn test_non_bundle_rejected() {
        let snap = components();
        let cap = snap.product(&ProductId::new("cap")).unwrap().clone();
        let calc = AvailabilityCalculator::default();
        assert!(calc.compute_bundle_availability(&cap, &snap).is_err());
    }

    #[test]
    fn test_line_availability() {
        let snap = components();
        let calc = AvailabilityCalculator::default();
        let shirt = snap.product(&ProductId::new("shirt")).unwrap();
        assert_eq!(
            calc.line_availability(shirt, Some(&VariantId::new("shirt-red-m")), &snap)
                .unwrap(),
            Availability::Finite(12)
        );
        let sticker = snap.product(&ProductId::new("sticker")).unwrap();
        assert_eq!(
            calc.line_availability(sticker, None, &snap).unwrap(),
            Availability::Unlimited
        );
        assert!(Availability::Finite(12).covers(12));
        assert!(!Availability::Finite(12).covers(13));
    }

    #[test]
    fn test_availability_wire_format() {
        let json = serde_json::to_string(&Availability::Finite(12)).unwrap();
        assert_eq!(json, r#"{"kind":"FINITE","units":12}"#);
        let json = serde_json::to_string(&Availability::Unlimited).unwrap();
        assert_eq!(json, r#"{"kind":"UNLIMITED"}"#);
    }
}
