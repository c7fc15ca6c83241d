//! Money helpers.
//!
//! Amounts are carried as `f64` at full precision through every sum and are
//! only floored to whole currency units when they are formatted for display.

use serde::{Deserialize, Serialize};

/// Display settings for currency amounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyFormat {
    pub symbol: String,
    pub thousands_separator: char,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            symbol: "Rp".to_string(),
            thousands_separator: '.',
        }
    }
}

impl CurrencyFormat {
    /// Format `amount` floored to whole units, e.g. `Rp 35.000`
    pub fn format(&self, amount: f64) -> String {
        let floored = if amount.is_finite() { amount.floor() } else { 0.0 };
        let sign = if floored < 0.0 { "-" } else { "" };
        let digits = format!("{:.0}", floored.abs());
        format!(
            "{}{} {}",
            sign,
            self.symbol,
            group_thousands(&digits, self.thousands_separator)
        )
    }
}

fn group_thousands(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(digit);
    }
    grouped
}

/// `percent`% of `amount`
pub fn percentage_of(amount: f64, percent: f64) -> f64 {
    amount * percent / 100.0
}

/// Share of `total` for each of `count` people; zero people counts as one
pub fn divide_evenly(total: f64, count: usize) -> f64 {
    total / count.max(1) as f64
}
