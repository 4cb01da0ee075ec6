//! Money type for representing monetary values.
//!
//! Amounts are integer minor units (agorot, cents). Nothing in this module
//! touches floating point, so totals are reproducible across platforms.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Basis points in one whole (100%).
pub const BASIS_POINTS_SCALE: u32 = 10_000;

/// Supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    ILS,
    USD,
    EUR,
    GBP,
}

impl Currency {
    /// Get the currency code (e.g., "ILS").
    pub fn code(&self) -> &'static str {
        match self {
            Currency::ILS => "ILS",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
        }
    }

    /// Get the currency symbol (e.g., "₪").
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::ILS => "\u{20aa}",
            Currency::USD => "$",
            Currency::EUR => "\u{20ac}",
            Currency::GBP => "\u{00a3}",
        }
    }

    /// Number of minor-unit decimal places.
    pub fn decimal_places(&self) -> u32 {
        2
    }

    /// Minor units per major unit (100 for every supported currency).
    pub fn minor_per_major(&self) -> i64 {
        10_i64.pow(self.decimal_places())
    }

    /// Parse a currency code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "ILS" | "NIS" => Some(Currency::ILS),
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary value with currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in the smallest currency unit.
    pub amount_minor: i64,
    /// The currency.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money value from minor units.
    pub fn new(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    /// Create a Money value from whole major units (e.g., 180 ILS).
    pub fn from_major(amount: i64, currency: Currency) -> Option<Self> {
        amount
            .checked_mul(currency.minor_per_major())
            .map(|minor| Self::new(minor, currency))
    }

    /// Parse a decimal string such as `"180"`, `"49.9"` or `"162.00"`.
    ///
    /// At most `decimal_places` fractional digits are accepted; anything
    /// finer is rejected rather than rounded.
    ///
    /// ```
    /// use storefront_pricing::money::{Currency, Money};
    /// let price = Money::parse_decimal("49.99", Currency::ILS).unwrap();
    /// assert_eq!(price.amount_minor, 4999);
    /// ```
    pub fn parse_decimal(input: &str, currency: Currency) -> Option<Self> {
        let input = input.trim();
        let (negative, digits) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        let places = currency.decimal_places() as usize;
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if frac.len() > places || !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return None;
        }

        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut frac_minor: i64 = if frac.is_empty() { 0 } else { frac.parse().ok()? };
        for _ in frac.len()..places {
            frac_minor *= 10;
        }

        let minor = whole
            .checked_mul(currency.minor_per_major())?
            .checked_add(frac_minor)?;
        Some(Self::new(if negative { -minor } else { minor }, currency))
    }

    /// Create a zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    /// Check if this is positive.
    pub fn is_positive(&self) -> bool {
        self.amount_minor > 0
    }

    /// Check if this is negative.
    pub fn is_negative(&self) -> bool {
        self.amount_minor < 0
    }

    /// Format as a display string (e.g., "₪49.99").
    pub fn display(&self) -> String {
        format!("{}{}", self.currency.symbol(), self.display_amount())
    }

    /// Format without symbol (e.g., "49.99").
    pub fn display_amount(&self) -> String {
        let scale = self.currency.minor_per_major();
        let sign = if self.amount_minor < 0 { "-" } else { "" };
        let abs = self.amount_minor.unsigned_abs();
        let places = self.currency.decimal_places() as usize;
        format!(
            "{}{}.{:0places$}",
            sign,
            abs / scale as u64,
            abs % scale as u64
        )
    }

    /// Add another Money value, returning None on currency mismatch or overflow.
    pub fn try_add(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount_minor
            .checked_add(other.amount_minor)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Subtract another Money value, returning None on currency mismatch or overflow.
    pub fn try_subtract(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount_minor
            .checked_sub(other.amount_minor)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Multiply by a quantity, returning None on overflow.
    pub fn try_multiply(&self, factor: i64) -> Option<Money> {
        self.amount_minor
            .checked_mul(factor)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Take `basis_points / 10000` of this amount, rounding half-up.
    ///
    /// Only meaningful for non-negative amounts; negative inputs yield zero.
    pub fn percentage_bps(&self, basis_points: u32) -> Money {
        if self.amount_minor <= 0 {
            return Money::zero(self.currency);
        }
        let scale = i128::from(BASIS_POINTS_SCALE);
        let raw = i128::from(self.amount_minor) * i128::from(basis_points);
        let rounded = (raw + scale / 2) / scale;
        Money::new(i64::try_from(rounded).unwrap_or(i64::MAX), self.currency)
    }

    /// The smaller of two amounts in the same currency.
    pub fn min(self, other: Money) -> Money {
        if other.amount_minor < self.amount_minor {
            other
        } else {
            self
        }
    }

    /// Clamp to zero from below.
    pub fn non_negative(self) -> Money {
        if self.amount_minor < 0 {
            Money::zero(self.currency)
        } else {
            self
        }
    }

    /// Sum an iterator of Money values, returning None on mismatch or overflow.
    pub fn try_sum<'a>(mut iter: impl Iterator<Item = &'a Money>, currency: Currency) -> Option<Money> {
        iter.try_fold(Money::zero(currency), |acc, m| acc.try_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}
