//! Product, variant and bundle composition types.

use std::collections::BTreeMap;

use crate::catalog::CustomFields;
use crate::ids::{CategoryId, OptionId, ProductId, VariantId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Product type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    /// Simple product with no variants.
    #[default]
    Simple,
    /// Product with variants (e.g., size, color).
    Variable,
    /// Bundle of other products; stock is derived.
    Bundle,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Simple => "SIMPLE",
            ProductType::Variable => "VARIABLE",
            ProductType::Bundle => "BUNDLE",
        }
    }
}

/// A product as seen by the pricing engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// Type of product.
    #[serde(rename = "type")]
    pub product_type: ProductType,
    /// Base price. Variants may override it.
    pub price: Money,
    /// Whether stock is tracked for this product.
    #[serde(default = "default_true")]
    pub track_inventory: bool,
    /// On-hand stock. Not authoritative for bundles.
    #[serde(default)]
    pub inventory_quantity: i64,
    /// Categories this product belongs to.
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
    /// Options this product declares (product-level or shared store options).
    #[serde(default)]
    pub option_ids: Vec<OptionId>,
    /// Bundle composition. Empty unless `product_type` is `Bundle`.
    #[serde(default)]
    pub bundle_items: Vec<BundleItem>,
    /// Typed custom field values.
    #[serde(default)]
    pub custom_fields: CustomFields,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// Create a tracked simple product.
    pub fn simple(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Money,
        inventory_quantity: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            product_type: ProductType::Simple,
            price,
            track_inventory: true,
            inventory_quantity,
            category_ids: Vec::new(),
            option_ids: Vec::new(),
            bundle_items: Vec::new(),
            custom_fields: CustomFields::default(),
        }
    }

    /// Create a variable product. Stock lives on its variants.
    pub fn variable(id: impl Into<ProductId>, name: impl Into<String>, price: Money) -> Self {
        Self {
            product_type: ProductType::Variable,
            ..Self::simple(id, name, price, 0)
        }
    }

    /// Create a bundle from its composition.
    pub fn bundle(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Money,
        items: Vec<BundleItem>,
    ) -> Self {
        let mut bundle = Self {
            product_type: ProductType::Bundle,
            ..Self::simple(id, name, price, 0)
        };
        bundle.bundle_items = items;
        bundle.bundle_items.sort_by_key(|item| item.sort_order);
        bundle
    }

    /// Disable inventory tracking.
    pub fn untracked(mut self) -> Self {
        self.track_inventory = false;
        self
    }

    /// Add a category to this product.
    pub fn with_category(mut self, category_id: impl Into<CategoryId>) -> Self {
        let category_id = category_id.into();
        if !self.category_ids.contains(&category_id) {
            self.category_ids.push(category_id);
        }
        self
    }

    /// Declare an option on this product.
    pub fn with_option(mut self, option_id: impl Into<OptionId>) -> Self {
        self.option_ids.push(option_id.into());
        self
    }

    /// Check if this is a bundle.
    pub fn is_bundle(&self) -> bool {
        self.product_type == ProductType::Bundle
    }

    /// Bundle items that constrain availability.
    pub fn required_items(&self) -> impl Iterator<Item = &BundleItem> {
        self.bundle_items.iter().filter(|item| !item.is_optional)
    }

    /// Check whether the product belongs to any of the given categories.
    pub fn in_any_category(&self, categories: &[CategoryId]) -> bool {
        self.category_ids.iter().any(|c| categories.contains(c))
    }
}

/// A concrete, independently stocked SKU of a variable product.
///
/// Option selections are fixed at creation; only stock and price change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductVariant {
    /// Unique variant identifier.
    pub id: VariantId,
    /// Parent product ID.
    pub product_id: ProductId,
    /// Stock keeping unit.
    pub sku: String,
    /// Price override. Falls back to the product price.
    #[serde(default)]
    pub price: Option<Money>,
    /// On-hand stock.
    #[serde(default)]
    pub inventory_quantity: i64,
    /// Option name to selected value (e.g., "Color" -> "Red").
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl ProductVariant {
    /// Create a new variant.
    pub fn new(
        id: impl Into<VariantId>,
        product_id: impl Into<ProductId>,
        sku: impl Into<String>,
        inventory_quantity: i64,
    ) -> Self {
        Self {
            id: id.into(),
            product_id: product_id.into(),
            sku: sku.into(),
            price: None,
            inventory_quantity,
            options: BTreeMap::new(),
        }
    }

    /// Set a price override.
    pub fn with_price(mut self, price: Money) -> Self {
        self.price = Some(price);
        self
    }

    /// Select a value for an option.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Build the display name from option values ("Red / M").
    pub fn build_name(&self) -> String {
        if self.options.is_empty() {
            "Default".to_string()
        } else {
            self.options
                .values()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" / ")
        }
    }
}

/// One component of a bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleItem {
    /// Component product.
    pub product_id: ProductId,
    /// Specific variant of the component, if pinned.
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    /// Units of the component per bundle (at least 1).
    pub quantity: u32,
    /// Optional components never constrain availability.
    #[serde(default)]
    pub is_optional: bool,
    /// Display order.
    #[serde(default)]
    pub sort_order: i32,
}

impl BundleItem {
    /// A required component.
    pub fn required(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            variant_id: None,
            quantity,
            is_optional: false,
            sort_order: 0,
        }
    }

    /// An optional component.
    pub fn optional(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            is_optional: true,
            ..Self::required(product_id, quantity)
        }
    }

    /// Pin a specific variant.
    pub fn with_variant(mut self, variant_id: impl Into<VariantId>) -> Self {
        self.variant_id = Some(variant_id.into());
        self
    }

    /// Set the display order.
    pub fn at(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }
}
