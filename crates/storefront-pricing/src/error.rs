//! Pricing error types.
//!
//! Two families: [`PricingError`] aborts a computation and no total may be
//! shown, [`CouponError`] is attached to an otherwise valid breakdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which catalog record a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogEntity {
    Product,
    Variant,
    Option,
}

impl fmt::Display for CatalogEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product => write!(f, "product"),
            Self::Variant => write!(f, "variant"),
            Self::Option => write!(f, "option"),
        }
    }
}

/// Fatal errors. The whole cart computation is abandoned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    /// A referenced product or variant is missing or inconsistent in the snapshot.
    #[error("Catalog lookup failed for {entity} {id}: {reason}")]
    CatalogLookupFailed {
        entity: CatalogEntity,
        id: String,
        reason: String,
    },

    /// A bundle's composition cannot be evaluated.
    #[error("Invalid bundle composition for {bundle}: {reason}")]
    InvalidBundleComposition { bundle: String, reason: String },

    /// A request line cannot be priced (bad quantity, foreign currency).
    #[error("Invalid cart line for {product}: {reason}")]
    InvalidLine { product: String, reason: String },

    /// An internal arithmetic invariant failed. Always a bug.
    #[error("Arithmetic invariant violated: {0}")]
    ArithmeticInvariantViolation(String),

    /// A rule or coupon carries a value no store may configure.
    #[error("Invalid discount {discount}: {reason}")]
    InvalidDiscount { discount: String, reason: String },

    /// Amounts in different currencies were combined.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// An external read model could not be consulted.
    #[error("{collaborator} unavailable: {message}")]
    CollaboratorFailed {
        collaborator: &'static str,
        message: String,
    },
}

impl PricingError {
    pub(crate) fn missing_product(id: impl Into<String>) -> Self {
        Self::CatalogLookupFailed {
            entity: CatalogEntity::Product,
            id: id.into(),
            reason: "not present in catalog snapshot".to_string(),
        }
    }

    pub(crate) fn missing_variant(id: impl Into<String>) -> Self {
        Self::CatalogLookupFailed {
            entity: CatalogEntity::Variant,
            id: id.into(),
            reason: "not present in catalog snapshot".to_string(),
        }
    }

    pub(crate) fn invalid_record(
        entity: CatalogEntity,
        id: impl Into<String>,
        error: CatalogError,
    ) -> Self {
        Self::CatalogLookupFailed {
            entity,
            id: id.into(),
            reason: error.to_string(),
        }
    }

    pub(crate) fn overflow(context: &str) -> Self {
        Self::ArithmeticInvariantViolation(format!("overflow while computing {}", context))
    }
}

/// Recoverable coupon failures, reported alongside the breakdown.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CouponError {
    /// Unknown code, disabled, or not yet started.
    #[error("Coupon code is not valid")]
    CouponInvalid,

    /// Past its end date.
    #[error("Coupon has expired")]
    CouponExpired,

    /// Usage cap reached.
    #[error("Coupon usage limit reached")]
    CouponUsageExceeded,

    /// Valid coupon whose conditions the cart does not meet.
    #[error("Coupon does not apply to this cart")]
    CouponNotApplicable,
}

/// Errors from cart session mutations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CartError {
    /// Quantity must be at least 1.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Quantity exceeds maximum allowed.
    #[error("Quantity {0} exceeds maximum allowed ({1})")]
    QuantityExceedsLimit(i64, i64),

    /// No such line in the cart.
    #[error("Line not in cart: {0}")]
    LineNotFound(String),

    /// Line priced in another currency than the cart.
    #[error("Currency mismatch: cart is {expected}, line is {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in cart calculation")]
    Overflow,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CartError {
    fn from(e: serde_json::Error) -> Self {
        CartError::Serialization(e.to_string())
    }
}

/// Errors loading a store fixture.
#[derive(Error, Debug)]
pub enum FixtureError {
    /// Not valid fixture JSON.
    #[error("Malformed fixture: {0}")]
    Parse(#[from] serde_json::Error),

    /// Parsed, but a record in it cannot be used for pricing.
    #[error("Invalid fixture for store {store}: {source}")]
    Invalid {
        store: String,
        #[source]
        source: PricingError,
    },
}

/// Errors validating typed option selections and custom fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Selection names an option the product does not declare.
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    /// Declared option left unselected.
    #[error("Missing selection for option: {0}")]
    MissingOption(String),

    /// Value is not one of the option's declared values.
    #[error("Value {value:?} is not declared for option {option}")]
    UndeclaredValue { option: String, value: String },

    /// Custom field key has no definition.
    #[error("Unknown custom field: {0}")]
    UnknownField(String),

    /// Custom field value does not match its declared kind.
    #[error("Custom field {key} expects {expected}")]
    FieldKindMismatch { key: String, expected: String },

    /// Required custom field absent.
    #[error("Missing required custom field: {0}")]
    MissingField(String),

    /// Value outside the declared set of choices or format.
    #[error("Invalid value for custom field {key}: {value:?}")]
    InvalidFieldValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_error_serializes_by_kind() {
        let json = serde_json::to_string(&CouponError::CouponExpired).unwrap();
        assert_eq!(json, "\"CouponExpired\"");
    }

    #[test]
    fn test_lookup_message_names_entity() {
        let err = PricingError::missing_variant("var-9");
        assert_eq!(
            err.to_string(),
            "Catalog lookup failed for variant var-9: not present in catalog snapshot"
        );
    }
}
