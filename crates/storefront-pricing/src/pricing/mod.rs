//! Shipping and the final cart breakdown.

mod aggregator;
mod shipping;

pub use aggregator::{aggregate, CartBreakdown, LineAvailability};
pub use shipping::ShippingPolicy;
