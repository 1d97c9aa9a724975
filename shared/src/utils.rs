//! # Shared Utility Functions
//!
//! Display helpers used by the dashboard client and its tooling.
//!
//! ## Money and Percentages
//!
//! - [`format_currency`] - Dollar amount with thousands separators and two decimals
//! - [`format_percent`] - Signed percentage with two decimals
//! - [`format_change`] - Signed dollar change, e.g. `+$12.30`
//!
//! ## Usage
//!
//! ```rust
//! use shared::utils::{format_currency, format_percent};
//!
//! assert_eq!(format_currency(100000.0), "$100,000.00");
//! assert_eq!(format_percent(-1.234), "-1.23%");
//! ```

/// Format an amount as US dollars with thousands separators.
///
/// # Examples
///
/// ```rust
/// use shared::utils::format_currency;
///
/// assert_eq!(format_currency(0.0), "$0.00");
/// assert_eq!(format_currency(1234567.891), "$1,234,567.89");
/// assert_eq!(format_currency(-42.5), "-$42.50");
/// ```
pub fn format_currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let fraction = cents % 100;

    format!("{}${}.{:02}", sign, group_thousands(whole), fraction)
}

/// Format a percentage with an explicit sign for positive values.
pub fn format_percent(percent: f64) -> String {
    if percent > 0.0 {
        format!("+{:.2}%", percent)
    } else {
        format!("{:.2}%", percent)
    }
}

/// Format a dollar change with an explicit sign.
pub fn format_change(change: f64) -> String {
    if change > 0.0 {
        format!("+{}", format_currency(change))
    } else {
        format_currency(change)
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    grouped
}
