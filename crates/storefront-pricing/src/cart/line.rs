//! Cart lines, as stored in a session and as priced for a computation.

use crate::error::CartError;
use crate::ids::{CategoryId, ProductId, VariantId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Maximum quantity allowed per line.
pub const MAX_QUANTITY_PER_ITEM: i64 = 9999;

/// A line in a cart session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    /// Product being purchased.
    pub product_id: ProductId,
    /// Selected variant, for variable products.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    /// Quantity (at least 1).
    pub quantity: i64,
    /// Unit price captured when the line was added.
    pub unit_price: Money,
}

impl CartLine {
    /// Create a new line, validating the quantity.
    pub fn new(
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
        unit_price: Money,
    ) -> Result<Self, CartError> {
        validate_quantity(quantity)?;
        Ok(Self {
            product_id,
            variant_id,
            quantity,
            unit_price,
        })
    }

    /// Whether this line refers to the given product/variant pair.
    pub fn is_for(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> bool {
        &self.product_id == product_id && self.variant_id.as_ref() == variant_id
    }

    /// Line total (unit price times quantity).
    pub fn total(&self) -> Result<Money, CartError> {
        self.unit_price
            .try_multiply(self.quantity)
            .ok_or(CartError::Overflow)
    }
}

/// Reject quantities outside `1..=MAX_QUANTITY_PER_ITEM`.
pub(crate) fn validate_quantity(quantity: i64) -> Result<(), CartError> {
    if quantity <= 0 {
        return Err(CartError::InvalidQuantity(quantity));
    }
    if quantity > MAX_QUANTITY_PER_ITEM {
        return Err(CartError::QuantityExceedsLimit(
            quantity,
            MAX_QUANTITY_PER_ITEM,
        ));
    }
    Ok(())
}

/// A line resolved against the catalog, ready for discount evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
    pub unit_price: Money,
    /// `unit_price * quantity`.
    pub line_total: Money,
    /// Categories of the product, for scoped discounts.
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

impl PricedLine {
    /// Price a line, checking the multiplication.
    pub fn new(
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
        unit_price: Money,
        category_ids: Vec<CategoryId>,
    ) -> Option<Self> {
        let line_total = unit_price.try_multiply(quantity)?;
        Some(Self {
            product_id,
            variant_id,
            quantity,
            unit_price,
            line_total,
            category_ids,
        })
    }
}
