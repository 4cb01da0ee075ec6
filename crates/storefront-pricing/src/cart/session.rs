//! Store-scoped cart session.

use super::line::{validate_quantity, CartLine, MAX_QUANTITY_PER_ITEM};
use crate::discount::normalize_code;
use crate::error::CartError;
use crate::ids::{ProductId, StoreId, VariantId};
use crate::money::{Currency, Money};
use crate::service::{ComputeRequest, RequestLine};
use serde::{Deserialize, Serialize};

/// A shopper's cart in one store.
///
/// Every mutation bumps `revision`; a caller recomputes after each one and
/// keeps only the result of the latest request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartSession {
    /// Store the cart belongs to.
    pub store_id: StoreId,
    /// Storefront slug, part of the storage key.
    pub store_slug: String,
    /// Cart currency.
    #[serde(default)]
    pub currency: Currency,
    /// Lines in insertion order.
    #[serde(default)]
    lines: Vec<CartLine>,
    /// Normalized coupon code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coupon_code: Option<String>,
    #[serde(default)]
    revision: u64,
}

impl CartSession {
    /// Create an empty cart for a store.
    pub fn new(
        store_id: impl Into<StoreId>,
        store_slug: impl Into<String>,
        currency: Currency,
    ) -> Self {
        Self {
            store_id: store_id.into(),
            store_slug: store_slug.into(),
            currency,
            lines: Vec::new(),
            coupon_code: None,
            revision: 0,
        }
    }

    /// Key the cart is persisted under.
    pub fn storage_key(&self) -> String {
        format!("cart_{}", self.store_slug)
    }

    /// Add an item to the cart.
    ///
    /// A line for the same product and variant is merged. Returns an error if:
    /// - Quantity is not positive
    /// - The merged quantity would exceed MAX_QUANTITY_PER_ITEM
    /// - The price is in another currency
    pub fn add_item(
        &mut self,
        product_id: impl Into<ProductId>,
        variant_id: Option<VariantId>,
        quantity: i64,
        unit_price: Money,
    ) -> Result<(), CartError> {
        let product_id = product_id.into();
        validate_quantity(quantity)?;
        if unit_price.currency != self.currency {
            return Err(CartError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: unit_price.currency.code().to_string(),
            });
        }

        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.is_for(&product_id, variant_id.as_ref()))
        {
            let merged = existing
                .quantity
                .checked_add(quantity)
                .ok_or(CartError::Overflow)?;
            if merged > MAX_QUANTITY_PER_ITEM {
                return Err(CartError::QuantityExceedsLimit(merged, MAX_QUANTITY_PER_ITEM));
            }
            existing.quantity = merged;
        } else {
            self.lines
                .push(CartLine::new(product_id, variant_id, quantity, unit_price)?);
        }

        self.touch();
        Ok(())
    }

    /// Set a line's quantity. A quantity of zero or less removes the line.
    pub fn update_quantity(
        &mut self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        quantity: i64,
    ) -> Result<(), CartError> {
        if quantity <= 0 {
            return if self.remove_item(product_id, variant_id) {
                Ok(())
            } else {
                Err(CartError::LineNotFound(product_id.to_string()))
            };
        }
        validate_quantity(quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.is_for(product_id, variant_id))
            .ok_or_else(|| CartError::LineNotFound(product_id.to_string()))?;
        line.quantity = quantity;
        self.touch();
        Ok(())
    }

    /// Remove a line. Returns whether anything was removed.
    pub fn remove_item(&mut self, product_id: &ProductId, variant_id: Option<&VariantId>) -> bool {
        let len_before = self.lines.len();
        self.lines.retain(|l| !l.is_for(product_id, variant_id));
        let removed = self.lines.len() < len_before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Set the coupon code. Replaces any previous code; a blank code removes it.
    pub fn apply_coupon(&mut self, code: &str) {
        let normalized = normalize_code(code);
        self.coupon_code = if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        };
        self.touch();
    }

    pub fn remove_coupon(&mut self) {
        if self.coupon_code.take().is_some() {
            self.touch();
        }
    }

    /// Empty the cart and drop the coupon.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.coupon_code = None;
        self.touch();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    /// Number of mutations so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of line totals at captured prices.
    pub fn subtotal(&self) -> Result<Money, CartError> {
        self.lines.iter().try_fold(Money::zero(self.currency), |acc, line| {
            acc.try_add(&line.total()?).ok_or(CartError::Overflow)
        })
    }

    /// Build a compute request for this cart.
    pub fn to_request(&self, seq: u64, evaluated_at: i64) -> ComputeRequest {
        ComputeRequest {
            seq,
            store_id: self.store_id.clone(),
            currency: self.currency,
            lines: self
                .lines
                .iter()
                .map(|l| RequestLine {
                    product_id: l.product_id.clone(),
                    variant_id: l.variant_id.clone(),
                    quantity: l.quantity,
                    unit_price: Some(l.unit_price),
                })
                .collect(),
            coupon_code: self.coupon_code.clone(),
            evaluated_at,
        }
    }

    pub fn to_json(&self) -> Result<String, CartError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a cart, re-checking every line.
    pub fn from_json(json: &str) -> Result<Self, CartError> {
        let session: CartSession = serde_json::from_str(json)?;
        for line in &session.lines {
            validate_quantity(line.quantity)?;
            if line.unit_price.currency != session.currency {
                return Err(CartError::CurrencyMismatch {
                    expected: session.currency.code().to_string(),
                    got: line.unit_price.currency.code().to_string(),
                });
            }
        }
        Ok(session)
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ils(minor: i64) -> Money {
        Money::new(minor, Currency::ILS)
    }

    fn cart() -> CartSession {
        CartSession::new("store-1", "demo", Currency::ILS)
    }

    #[test]
    fn test_add_merges_same_line() {
        let mut cart = cart();
        cart.add_item("shirt", Some(VariantId::new("red")), 1, ils(5000))
            .unwrap();
        cart.add_item("shirt", Some(VariantId::new("red")), 2, ils(5000))
            .unwrap();
        cart.add_item("shirt", Some(VariantId::new("blue")), 1, ils(5000))
            .unwrap();
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.subtotal().unwrap(), ils(20_000));
        assert_eq!(cart.revision(), 3);
    }

    #[test]
    fn test_add_rejects_bad_input() {
        let mut cart = cart();
        assert_eq!(
            cart.add_item("p", None, 0, ils(100)),
            Err(CartError::InvalidQuantity(0))
        );
        assert!(matches!(
            cart.add_item("p", None, 1, Money::new(100, Currency::USD)),
            Err(CartError::CurrencyMismatch { .. })
        ));
        cart.add_item("p", None, MAX_QUANTITY_PER_ITEM, ils(100)).unwrap();
        assert_eq!(
            cart.add_item("p", None, 1, ils(100)),
            Err(CartError::QuantityExceedsLimit(
                MAX_QUANTITY_PER_ITEM + 1,
                MAX_QUANTITY_PER_ITEM
            ))
        );
        assert_eq!(cart.revision(), 1);
    }

    #[test]
    fn test_update_and_remove() {
        let mut cart = cart();
        let mug = ProductId::new("mug");
        cart.add_item(mug.clone(), None, 1, ils(2500)).unwrap();

        cart.update_quantity(&mug, None, 5).unwrap();
        assert_eq!(cart.item_count(), 5);

        assert!(matches!(
            cart.update_quantity(&ProductId::new("ghost"), None, 1),
            Err(CartError::LineNotFound(_))
        ));

        cart.update_quantity(&mug, None, 0).unwrap();
        assert!(cart.is_empty());
        assert!(!cart.remove_item(&mug, None));
    }

    #[test]
    fn test_coupon_normalized_and_cleared() {
        let mut cart = cart();
        cart.apply_coupon("  save10 ");
        assert_eq!(cart.coupon_code(), Some("SAVE10"));
        cart.apply_coupon("   ");
        assert_eq!(cart.coupon_code(), None);

        cart.apply_coupon("x");
        cart.add_item("mug", None, 1, ils(100)).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.coupon_code(), None);
    }

    #[test]
    fn test_storage_key_and_round_trip() {
        let mut cart = cart();
        cart.add_item("mug", None, 2, ils(2500)).unwrap();
        cart.apply_coupon("welcome");
        assert_eq!(cart.storage_key(), "cart_demo");

        let json = cart.to_json().unwrap();
        assert_eq!(CartSession::from_json(&json).unwrap(), cart);
    }

    #[test]
    fn test_from_json_rejects_bad_lines() {
        let json = r#"{
            "store_id": "s",
            "store_slug": "s",
            "lines": [
                { "product_id": "mug", "quantity": 0,
                  "unit_price": { "amount_minor": 100, "currency": "ILS" } }
            ]
        }"#;
        assert_eq!(
            CartSession::from_json(json),
            Err(CartError::InvalidQuantity(0))
        );
        assert!(matches!(
            CartSession::from_json("not json"),
            Err(CartError::Serialization(_))
        ));
    }

    #[test]
    fn test_to_request_carries_captured_prices() {
        let mut cart = cart();
        cart.add_item("mug", None, 2, ils(2500)).unwrap();
        cart.apply_coupon("welcome");
        let request = cart.to_request(9, 1_700_000_000);
        assert_eq!(request.seq, 9);
        assert_eq!(request.lines[0].unit_price, Some(ils(2500)));
        assert_eq!(request.coupon_code.as_deref(), Some("WELCOME"));
    }
}
