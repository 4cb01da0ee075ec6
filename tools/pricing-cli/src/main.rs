//! Storefront pricing CLI - quote carts and check bundle availability
//! against store fixtures.
//!
//! Commands:
//! - `storefront-pricing quote` - Price a cart and print its breakdown
//! - `storefront-pricing availability` - Show sellable units for products and bundles
//! - `storefront-pricing config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{AvailabilityArgs, ConfigArgs, QuoteArgs};

/// Storefront pricing - quote carts against store fixtures
#[derive(Parser)]
#[command(name = "storefront-pricing")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a cart and show the breakdown
    Quote(QuoteArgs),

    /// Show availability for products and bundles
    Availability(AvailabilityArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Logs go to stderr so quotes on stdout stay pipeable.
fn init_tracing(verbose: bool, json: bool) {
    let default_directive = if verbose {
        "storefront_pricing=debug,info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json);

    let output = output::Output::new(cli.json);

    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, output)?;

    let result = match cli.command {
        Commands::Quote(args) => commands::quote::run(args, &ctx).await,
        Commands::Availability(args) => commands::availability::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
