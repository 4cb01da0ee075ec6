//! CLI command implementations.

pub mod availability;
pub mod config;
pub mod quote;

use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};
use storefront_pricing::memory::{InMemoryStore, StoreFixture};

/// Arguments for the quote command.
#[derive(Args)]
pub struct QuoteArgs {
    /// Store fixture (JSON). Defaults to `fixture` in the config file.
    #[arg(short, long)]
    pub fixture: Option<String>,

    /// Store slug or id. Required when the fixture holds several stores.
    #[arg(short, long)]
    pub store: Option<String>,

    /// Cart line as `product[:variant]=quantity`. Repeatable.
    #[arg(short, long = "item", value_name = "PRODUCT[:VARIANT]=QTY")]
    pub items: Vec<String>,

    /// Coupon code to apply.
    #[arg(long)]
    pub coupon: Option<String>,

    /// Saved cart session files (JSON). Several are priced concurrently.
    #[arg(long = "cart", value_name = "FILE")]
    pub carts: Vec<String>,

    /// Evaluation time (RFC 3339). Defaults to now.
    #[arg(long)]
    pub at: Option<String>,

    /// Carts priced at once when several are given.
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,
}

/// Arguments for the availability command.
#[derive(Args)]
pub struct AvailabilityArgs {
    /// Store fixture (JSON). Defaults to `fixture` in the config file.
    #[arg(short, long)]
    pub fixture: Option<String>,

    /// Store slug or id. Required when the fixture holds several stores.
    #[arg(short, long)]
    pub store: Option<String>,

    /// Product to check. Without it every bundle is listed.
    pub product: Option<String>,

    /// Variant of the product.
    #[arg(long)]
    pub variant: Option<String>,

    /// Quantity the shopper wants; reports whether it can be added.
    #[arg(short, long)]
    pub quantity: Option<i64>,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Create a pricing.toml in the current directory
    Init {
        /// Fixture path to record in the file
        #[arg(long)]
        fixture: Option<String>,

        /// Overwrite without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Validate configuration
    Validate,
}

/// Pick the store a command works on.
pub(crate) fn select_store<'a>(
    store: &'a InMemoryStore,
    key: Option<&str>,
) -> Result<&'a StoreFixture> {
    if let Some(key) = key {
        return store
            .find_store(key)
            .ok_or_else(|| anyhow!("Store not found in fixture: {}", key));
    }

    let mut all = store.stores();
    match (all.next(), all.next()) {
        (Some(only), None) => Ok(only),
        (None, _) => bail!("Fixture contains no stores"),
        (Some(_), Some(_)) => bail!("Fixture holds several stores; pick one with --store"),
    }
}
