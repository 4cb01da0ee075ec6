//! Catalog read model.
//!
//! Contains products, variants, typed options, the per-computation snapshot
//! and bundle availability.

mod availability;
mod option;
mod product;
mod snapshot;

pub use availability::{Availability, AvailabilityCalculator, UntrackedInventory};
pub use option::{
    validate_selection, CustomFieldDefinition, CustomFields, FieldKind, FieldValue, OptionKind,
    OptionScope, OptionValue, ProductOption,
};
pub use product::{BundleItem, Product, ProductType, ProductVariant};
pub use snapshot::CatalogSnapshot;
