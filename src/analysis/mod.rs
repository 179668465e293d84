//! Client-side analysis over fetched record sets
//!
//! Everything here operates on records already in memory. Filters narrow a
//! record set, [`Statistics`] summarizes one, and [`FundingBalance`]
//! reconciles commitments against disbursements for a single billed entity.

pub mod balance;
pub mod filters;
pub mod stats;

pub use balance::FundingBalance;
pub use filters::{denied_or_unfunded, in_state, matching_organization, with_status};
pub use stats::Statistics;

/// Format a dollar amount with thousands separators, e.g. `$1,234,567.89`.
pub(crate) fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u128;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}${grouped}.{frac:02}")
}
