//! Output formatting for the CLI.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use storefront_pricing::catalog::Availability;
use storefront_pricing::{CouponError, Money};

/// Output handler for CLI messages.
#[derive(Clone)]
pub struct Output {
    json: bool,
}

impl Output {
    /// Create a new output handler.
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print an info message.
    pub fn info(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("ℹ").blue(), msg);
    }

    /// Print a success message.
    pub fn success(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("✓").green(), msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: &str) {
        if self.json {
            return;
        }
        eprintln!("{} {}", style("⚠").yellow(), msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
            return;
        }
        eprintln!("{} {}", style("✗").red(), style(msg).red());
    }

    /// Print a header/title.
    pub fn header(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print JSON output.
    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    /// Print a key-value pair.
    pub fn kv(&self, key: &str, value: &str) {
        if self.json {
            return;
        }
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(&self, item: &str) {
        if self.json {
            return;
        }
        println!("  {} {}", style("•").dim(), item);
    }

    /// Print a table row.
    pub fn table_row(&self, cols: &[&str], widths: &[usize]) {
        if self.json {
            return;
        }
        let formatted: Vec<String> = cols
            .iter()
            .zip(widths.iter())
            .map(|(col, width)| format!("{:width$}", col, width = width))
            .collect();
        println!("  {}", formatted.join("  "));
    }

    /// Create a progress bar.
    pub fn progress(&self, len: u64, msg: &str) -> ProgressBar {
        if self.json || len < 2 {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        if let Ok(bar) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar.progress_chars("#>-"));
        }
        pb.set_message(msg.to_string());
        pb
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// Amount with a minus sign and color for discounts.
pub fn discount_amount(amount: &Money) -> String {
    if amount.is_zero() {
        style(amount.display()).dim().to_string()
    } else {
        style(format!("-{}", amount.display())).green().to_string()
    }
}

/// Availability colored by how much is left.
pub fn availability_badge(availability: Availability, requested: Option<i64>) -> String {
    let text = availability.to_string();
    let short = requested
        .and_then(|qty| u64::try_from(qty).ok())
        .is_some_and(|qty| !availability.covers(qty));
    match availability {
        _ if short => style(text).red().to_string(),
        Availability::Finite(0) => style(text).red().to_string(),
        Availability::Finite(_) => style(text).yellow().to_string(),
        Availability::Unlimited => style(text).green().to_string(),
    }
}

/// Human wording for a rejected coupon.
pub fn coupon_message(error: CouponError) -> &'static str {
    match error {
        CouponError::CouponInvalid => "code not recognized",
        CouponError::CouponExpired => "coupon has expired",
        CouponError::CouponUsageExceeded => "coupon usage limit reached",
        CouponError::CouponNotApplicable => "cart does not meet the coupon's conditions",
    }
}
