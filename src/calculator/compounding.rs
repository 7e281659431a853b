use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use crate::error::CalculationError;

pub const DAYS_IN_YEAR: Decimal = dec!(365);

/// Ceiling for reported annualized rates, as a fraction
pub const ANNUALIZED_RATE_CAP: Decimal = dec!(1000000);

/// Whole calendar days from `start` to `end`
pub fn elapsed_days(start: NaiveDate, end: NaiveDate) -> Result<i64, CalculationError> {
    if end <= start {
        return Err(CalculationError::InvalidPeriod { start, end });
    }
    Ok((end - start).num_days())
}

/// Raise a growth factor to a fractional power
fn grow(factor: Decimal, exponent: Decimal, field: &str) -> Result<Decimal, CalculationError> {
    if factor <= Decimal::ZERO {
        return Err(CalculationError::validation(
            field,
            "rate implies a total loss of principal",
        ));
    }
    if exponent.is_zero() {
        return Ok(Decimal::ONE);
    }
    if exponent.fract().is_zero() {
        if let Some(n) = exponent.to_i64() {
            return factor
                .checked_powi(n)
                .ok_or_else(|| CalculationError::validation(field, "rate overflows compounding"));
        }
    }
    factor
        .checked_powd(exponent)
        .ok_or_else(|| CalculationError::validation(field, "rate overflows compounding"))
}

/// Period rate for an annual rate over `days`: `(1 + annual)^(days/365) - 1`
pub fn period_rate(annual_rate: Decimal, days: i64) -> Result<Decimal, CalculationError> {
    let factor = grow(
        Decimal::ONE + annual_rate,
        Decimal::from(days) / DAYS_IN_YEAR,
        "rate",
    )?;
    Ok(factor - Decimal::ONE)
}

/// Compound `annual_rate` from `start` to `end`
///
/// Returns the effective period rate together with the elapsed day count.
pub fn compound(
    annual_rate: Decimal,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(Decimal, i64), CalculationError> {
    let days = elapsed_days(start, end)?;
    Ok((period_rate(annual_rate, days)?, days))
}

/// Equivalent annual rate of a period rate earned over `days`
pub fn annualize(period_rate: Decimal, days: i64) -> Result<Decimal, CalculationError> {
    if days <= 0 {
        return Err(CalculationError::validation(
            "elapsed_days",
            "must be positive to annualize",
        ));
    }
    let factor = grow(
        Decimal::ONE + period_rate,
        DAYS_IN_YEAR / Decimal::from(days),
        "effective_rate",
    )?;
    Ok(factor - Decimal::ONE)
}

/// [`annualize`] for reporting: clamped to `[-1, ANNUALIZED_RATE_CAP]` instead of failing
///
/// `days` must be positive.
pub fn annualize_capped(period_rate: Decimal, days: i64) -> Decimal {
    if period_rate <= -Decimal::ONE {
        return -Decimal::ONE;
    }
    annualize(period_rate, days)
        .map(|rate| rate.min(ANNUALIZED_RATE_CAP))
        .unwrap_or(ANNUALIZED_RATE_CAP)
}
