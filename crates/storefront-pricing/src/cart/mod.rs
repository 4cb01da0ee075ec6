//! Shopping cart module.
//!
//! Contains the cart session and its lines.

mod line;
mod session;

pub use line::{CartLine, PricedLine, MAX_QUANTITY_PER_ITEM};
pub use session::CartSession;
