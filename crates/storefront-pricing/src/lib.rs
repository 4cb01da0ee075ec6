//! Cart pricing and bundle availability for multi-tenant storefronts.
//!
//! This crate turns a cart into a reproducible price breakdown:
//!
//! - **Catalog**: Products, variants, typed options, snapshots, bundle availability
//! - **Discount**: Automatic rules and coupons, applied sequentially
//! - **Pricing**: Threshold shipping and the final [`CartBreakdown`]
//! - **Cart**: Store-scoped cart sessions with a JSON storage contract
//! - **Service**: Async collaborator seams and last-request-wins sequencing
//!
//! All money is integer minor units; nothing here uses floating point.
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_pricing::prelude::*;
//!
//! let store = InMemoryStore::new()
//!     .with_snapshot(
//!         CatalogSnapshot::new("store-1", 1)
//!             .with_product(Product::simple("mug", "Mug", Money::new(2500, Currency::ILS), 10)),
//!     )
//!     .with_coupon("store-1", Coupon::percentage("c1", "WELCOME", "Welcome", 1000));
//! let service = PricingService::new(store);
//! let gate = SequenceGate::new();
//!
//! let mut cart = CartSession::new("store-1", "demo", Currency::ILS);
//! cart.add_item("mug", None, 2, Money::new(2500, Currency::ILS))?;
//! cart.apply_coupon("welcome");
//!
//! let seq = gate.issue();
//! let breakdown = service.compute(&cart.to_request(seq, now)).await?;
//! if let Some(breakdown) = gate.accept(seq, breakdown) {
//!     println!("Total: {}", breakdown.grand_total.display());
//! }
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod catalog;
pub mod discount;
pub mod memory;
pub mod pricing;
pub mod sequence;
pub mod service;

pub use error::{CartError, CatalogError, CouponError, FixtureError, PricingError};
pub use ids::*;
pub use money::{Currency, Money};
pub use pricing::CartBreakdown;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{CartError, CatalogError, CouponError, FixtureError, PricingError};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Catalog
    pub use crate::catalog::{
        Availability, AvailabilityCalculator, BundleItem, CatalogSnapshot, Product,
        ProductOption, ProductType, ProductVariant, UntrackedInventory,
    };

    // Discounts
    pub use crate::discount::{
        AppliedDiscount, Coupon, CouponBasis, DiscountCondition, DiscountEngine, DiscountRule,
        DiscountScope, DiscountType, DiscountValue,
    };

    // Pricing
    pub use crate::pricing::{CartBreakdown, LineAvailability, ShippingPolicy};

    // Cart
    pub use crate::cart::{CartLine, CartSession};

    // Service
    pub use crate::memory::{InMemoryStore, StoreFixture};
    pub use crate::sequence::SequenceGate;
    pub use crate::service::{
        CatalogReader, ComputeRequest, DiscountSource, EngineConfig, PricingService,
        RequestLine, ShippingSettings,
    };
}
