//! Rounding and Brazilian-locale formatting helpers
//!
//! Money is always rounded to cents with midpoints away from zero before it
//! leaves the engine. Display helpers use the Brazilian convention of `.` for
//! thousands and `,` for decimals.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a BRL amount to cents, midpoint away from zero
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a percentage for reporting
pub fn round_percent(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a rate expressed in percent to four decimals
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// Group the integer digits of a non-negative number string with `.`
fn group_thousands(integer_part: &str) -> String {
    let digits: Vec<char> = integer_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }
    grouped
}

fn format_br(value: Decimal, decimals: u32) -> String {
    let rounded = value
        .abs()
        .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let formatted = format!("{:.*}", decimals as usize, rounded);
    let (integer_part, decimal_part) = formatted.split_once('.').unwrap_or((&formatted, ""));

    let sign = if value.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    if decimal_part.is_empty() {
        format!("{}{}", sign, group_thousands(integer_part))
    } else {
        format!("{}{},{}", sign, group_thousands(integer_part), decimal_part)
    }
}

/// Format as Brazilian Real: "R$ 1.234,56"
///
/// # Examples
/// ```
/// use nestegg::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(1234.56)), "R$ 1.234,56");
/// assert_eq!(format_currency(dec!(-500)), "R$ -500,00");
/// ```
pub fn format_currency(value: Decimal) -> String {
    format!("R$ {}", format_br(value, 2))
}

/// Format a percentage with two decimals: "12,34%"
///
/// # Examples
/// ```
/// use nestegg::utils::format_percent;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_percent(dec!(14.5)), "14,50%");
/// ```
pub fn format_percent(value: Decimal) -> String {
    format!("{}%", format_br(value, 2))
}

/// Format a fraction (0.1065) as a percentage with four decimals: "10,6500%"
pub fn format_fraction_percent(value: Decimal) -> String {
    format!("{}%", format_br(value * Decimal::ONE_HUNDRED, 4))
}
