//! Point-in-time catalog read model for a single computation.

use std::collections::BTreeMap;

use crate::catalog::{
    validate_selection, CustomFieldDefinition, Product, ProductOption, ProductVariant,
};
use crate::error::{CatalogError, CatalogEntity, PricingError};
use crate::ids::{OptionId, ProductId, StoreId, VariantId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Read-only view of the products, variants and options one computation needs.
///
/// A snapshot is taken at a single `version` of the catalog. Stock figures in
/// it are advisory: nothing is reserved, and the authoritative check happens
/// when an order is committed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Store the snapshot belongs to.
    pub store_id: StoreId,
    /// Catalog version the snapshot was read at.
    pub version: u64,
    #[serde(default)]
    products: BTreeMap<ProductId, Product>,
    #[serde(default)]
    variants: BTreeMap<VariantId, ProductVariant>,
    #[serde(default)]
    options: BTreeMap<OptionId, ProductOption>,
    /// Store-level custom field definitions products are checked against.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    field_definitions: Vec<CustomFieldDefinition>,
}

impl CatalogSnapshot {
    /// Create an empty snapshot.
    pub fn new(store_id: impl Into<StoreId>, version: u64) -> Self {
        Self {
            store_id: store_id.into(),
            version,
            ..Default::default()
        }
    }

    /// Add a product (builder style).
    pub fn with_product(mut self, product: Product) -> Self {
        self.insert_product(product);
        self
    }

    /// Add a variant (builder style).
    pub fn with_variant(mut self, variant: ProductVariant) -> Self {
        self.insert_variant(variant);
        self
    }

    /// Add an option (builder style).
    pub fn with_option(mut self, option: ProductOption) -> Self {
        self.insert_option(option);
        self
    }

    /// Add a custom field definition (builder style).
    pub fn with_field_definition(mut self, definition: CustomFieldDefinition) -> Self {
        self.field_definitions.push(definition);
        self
    }

    pub fn insert_product(&mut self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    pub fn insert_variant(&mut self, variant: ProductVariant) {
        self.variants.insert(variant.id.clone(), variant);
    }

    pub fn insert_option(&mut self, option: ProductOption) {
        self.options.insert(option.id.clone(), option);
    }

    /// Look up a product. Missing records are fatal for the computation.
    pub fn product(&self, id: &ProductId) -> Result<&Product, PricingError> {
        self.products
            .get(id)
            .ok_or_else(|| PricingError::missing_product(id.as_str()))
    }

    /// Look up a variant, check it belongs to `product_id` and that its
    /// option selection matches what the product declares.
    pub fn variant_of(
        &self,
        product_id: &ProductId,
        variant_id: &VariantId,
    ) -> Result<&ProductVariant, PricingError> {
        let variant = self
            .variants
            .get(variant_id)
            .ok_or_else(|| PricingError::missing_variant(variant_id.as_str()))?;

        if &variant.product_id != product_id {
            return Err(PricingError::CatalogLookupFailed {
                entity: CatalogEntity::Variant,
                id: variant_id.to_string(),
                reason: format!(
                    "belongs to product {}, not {}",
                    variant.product_id, product_id
                ),
            });
        }
        self.validate_variant(variant).map_err(|e| {
            PricingError::invalid_record(CatalogEntity::Variant, variant_id.as_str(), e)
        })?;
        Ok(variant)
    }

    /// Current unit price of a product or one of its variants.
    pub fn unit_price(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<Money, PricingError> {
        let product = self.product(product_id)?;
        match variant_id {
            Some(vid) => Ok(self
                .variant_of(product_id, vid)?
                .price
                .unwrap_or(product.price)),
            None => Ok(product.price),
        }
    }

    /// Options a product declares, in declaration order. Unknown ids are skipped.
    pub fn options_for(&self, product: &Product) -> Vec<&ProductOption> {
        product
            .option_ids
            .iter()
            .filter_map(|id| self.options.get(id))
            .collect()
    }

    /// Validate a variant's option selection against its product's options.
    pub fn validate_variant(&self, variant: &ProductVariant) -> Result<(), CatalogError> {
        let declared = match self.products.get(&variant.product_id) {
            Some(product) => self.options_for(product),
            None => Vec::new(),
        };
        validate_selection(declared, &variant.options)
    }

    /// Check every option definition, variant selection and product custom
    /// field. Stops at the first bad record.
    pub fn validate(&self) -> Result<(), PricingError> {
        for option in self.options.values() {
            option.validate_definition().map_err(|e| {
                PricingError::invalid_record(CatalogEntity::Option, option.id.as_str(), e)
            })?;
        }
        for variant in self.variants.values() {
            if !self.contains_product(&variant.product_id) {
                return Err(PricingError::CatalogLookupFailed {
                    entity: CatalogEntity::Variant,
                    id: variant.id.to_string(),
                    reason: format!("product {} is not in the catalog", variant.product_id),
                });
            }
            self.validate_variant(variant).map_err(|e| {
                PricingError::invalid_record(CatalogEntity::Variant, variant.id.as_str(), e)
            })?;
        }
        for product in self.products.values() {
            product
                .custom_fields
                .validate(&self.field_definitions)
                .map_err(|e| {
                    PricingError::invalid_record(CatalogEntity::Product, product.id.as_str(), e)
                })?;
        }
        Ok(())
    }

    /// Check whether the snapshot contains a product.
    pub fn contains_product(&self, id: &ProductId) -> bool {
        self.products.contains_key(id)
    }

    /// Number of products in the snapshot.
    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    /// Iterate over all products.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// Variants belonging to a product.
    pub fn variants_of<'a>(
        &'a self,
        product_id: &'a ProductId,
    ) -> impl Iterator<Item = &'a ProductVariant> + 'a {
        self.variants
            .values()
            .filter(move |v| &v.product_id == product_id)
    }

    /// Copy limited to `roots`, their variants and options, and the
    /// components of any bundle among them. Unknown ids are skipped.
    pub fn restricted_to(&self, roots: &[ProductId]) -> CatalogSnapshot {
        let mut out = CatalogSnapshot::new(self.store_id.clone(), self.version);
        out.field_definitions = self.field_definitions.clone();
        let mut pending: Vec<ProductId> = roots.to_vec();

        while let Some(id) = pending.pop() {
            if out.contains_product(&id) {
                continue;
            }
            let Some(product) = self.products.get(&id) else {
                continue;
            };
            pending.extend(product.bundle_items.iter().map(|i| i.product_id.clone()));
            for option in self.options_for(product) {
                out.insert_option(option.clone());
            }
            for variant in self.variants_of(&id) {
                out.insert_variant(variant.clone());
            }
            out.insert_product(product.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldKind, FieldValue, OptionKind, OptionScope, OptionValue};
    use crate::money::Currency;

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot::new("shop", 7)
            .with_product(
                Product::variable("shirt", "Shirt", Money::new(8000, Currency::ILS))
                    .with_option("opt-color"),
            )
            .with_product(Product::simple("mug", "Mug", Money::new(2500, Currency::ILS), 4))
            .with_variant(
                ProductVariant::new("shirt-red", "shirt", "SHIRT-RED", 12)
                    .with_price(Money::new(8500, Currency::ILS))
                    .with_option("Color", "Red"),
            )
            .with_variant(
                ProductVariant::new("shirt-blue", "shirt", "SHIRT-BLUE", 2)
                    .with_option("Color", "Blue"),
            )
            .with_option(ProductOption::new(
                "opt-color",
                "Color",
                OptionKind::Color,
                OptionScope::Store,
                vec![
                    OptionValue::color("Red", "#f00"),
                    OptionValue::color("Blue", "#00f"),
                ],
            ))
    }

    #[test]
    fn test_missing_product_is_lookup_failure() {
        let err = snapshot().product(&ProductId::new("ghost")).unwrap_err();
        assert!(matches!(
            err,
            PricingError::CatalogLookupFailed {
                entity: CatalogEntity::Product,
                ..
            }
        ));
    }

    #[test]
    fn test_variant_must_belong_to_product() {
        let snap = snapshot();
        assert!(snap
            .variant_of(&ProductId::new("shirt"), &VariantId::new("shirt-red"))
            .is_ok());
        assert!(snap
            .variant_of(&ProductId::new("mug"), &VariantId::new("shirt-red"))
            .is_err());
    }

    #[test]
    fn test_unit_price_falls_back_to_product() {
        let snap = snapshot();
        let shirt = ProductId::new("shirt");
        assert_eq!(
            snap.unit_price(&shirt, Some(&VariantId::new("shirt-red")))
                .unwrap()
                .amount_minor,
            8500
        );
        assert_eq!(
            snap.unit_price(&shirt, Some(&VariantId::new("shirt-blue")))
                .unwrap()
                .amount_minor,
            8000
        );
    }

    #[test]
    fn test_validate_variant_against_declared_options() {
        let snap = snapshot();
        let red = ProductVariant::new("x", "shirt", "X", 1).with_option("Color", "Red");
        assert!(snap.validate_variant(&red).is_ok());

        let green = ProductVariant::new("y", "shirt", "Y", 1).with_option("Color", "Green");
        assert!(snap.validate_variant(&green).is_err());
    }

    #[test]
    fn test_lookup_rejects_undeclared_value() {
        let snap = snapshot().with_variant(
            ProductVariant::new("shirt-purple", "shirt", "SHIRT-PURPLE", 3)
                .with_option("Color", "Purple"),
        );
        let err = snap
            .variant_of(&ProductId::new("shirt"), &VariantId::new("shirt-purple"))
            .unwrap_err();
        assert!(matches!(
            err,
            PricingError::CatalogLookupFailed {
                entity: CatalogEntity::Variant,
                ..
            }
        ));
        assert!(err.to_string().contains("Purple"));
    }

    #[test]
    fn test_validate_whole_catalog() {
        assert!(snapshot().validate().is_ok());

        let purple = snapshot().with_variant(
            ProductVariant::new("shirt-purple", "shirt", "SHIRT-PURPLE", 3)
                .with_option("Color", "Purple"),
        );
        assert!(purple.validate().is_err());

        let orphan = snapshot().with_variant(ProductVariant::new("hat-1", "hat", "HAT-1", 1));
        assert!(orphan.validate().is_err());

        let bad_swatch = snapshot().with_option(ProductOption::new(
            "opt-tone",
            "Tone",
            OptionKind::Color,
            OptionScope::Store,
            vec![OptionValue::text("Warm")],
        ));
        assert!(matches!(
            bad_swatch.validate(),
            Err(PricingError::CatalogLookupFailed {
                entity: CatalogEntity::Option,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_custom_fields() {
        let mut cup = Product::simple("cup", "Cup", Money::new(1000, Currency::ILS), 1);
        cup.custom_fields
            .insert("material", FieldValue::Text("tin".to_string()));
        let definition = CustomFieldDefinition {
            key: "material".to_string(),
            kind: FieldKind::Dropdown {
                choices: vec!["ceramic".to_string(), "glass".to_string()],
            },
            required: false,
        };
        let snap = snapshot()
            .with_field_definition(definition)
            .with_product(cup);
        assert!(matches!(
            snap.validate(),
            Err(PricingError::CatalogLookupFailed {
                entity: CatalogEntity::Product,
                ..
            })
        ));
    }

    #[test]
    fn test_restricted_to_pulls_bundle_components() {
        let snap = snapshot().with_product(Product::bundle(
            "kit",
            "Kit",
            Money::new(9000, Currency::ILS),
            vec![crate::catalog::BundleItem::required("shirt", 1).with_variant("shirt-red")],
        ));
        let sub = snap.restricted_to(&[ProductId::new("kit"), ProductId::new("ghost")]);
        assert_eq!(sub.version, 7);
        assert!(sub.contains_product(&ProductId::new("kit")));
        assert!(sub.contains_product(&ProductId::new("shirt")));
        assert!(!sub.contains_product(&ProductId::new("mug")));
        assert_eq!(sub.variants_of(&ProductId::new("shirt")).count(), 2);
        assert!(sub
            .variant_of(&ProductId::new("shirt"), &VariantId::new("shirt-red"))
            .is_ok());
    }
}
