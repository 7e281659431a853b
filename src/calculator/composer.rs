use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use tracing::debug;

use super::compounding::{annualize, annualize_capped, period_rate};
use super::projector::project;
use crate::config::ProjectionSettings;
use crate::error::CalculationError;
use crate::investments::{Investment, RateTerms};
use crate::rates::{Benchmark, RateSeries, RateSource};

/// SELIC above this level caps savings at 0.5% a month
const SAVINGS_SELIC_THRESHOLD: Decimal = dec!(0.085);
const SAVINGS_MONTHLY_RATE: Decimal = dec!(0.005);
const SAVINGS_SELIC_SHARE: Decimal = dec!(0.70);

/// The annual rate a variant earns over a date range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NominalRate {
    /// Annual rate as a fraction
    pub annual_rate: Decimal,
    /// Return over the whole range for price-driven variants, used as is
    /// instead of compounding `annual_rate`
    pub period_return: Option<Decimal>,
    pub used_projection: bool,
}

/// Savings yield implied by an annual SELIC rate
pub fn savings_yield_from_selic(selic: Decimal) -> Decimal {
    if selic > SAVINGS_SELIC_THRESHOLD {
        (Decimal::ONE + SAVINGS_MONTHLY_RATE).powi(12) - Decimal::ONE
    } else {
        selic * SAVINGS_SELIC_SHARE
    }
}

/// A benchmark as the composer reads it: a series plus a value transform
struct BenchmarkView<'a> {
    series: &'a RateSeries,
    derive_savings: bool,
}

impl<'a> BenchmarkView<'a> {
    fn resolve(benchmark: Benchmark, rates: &'a dyn RateSource) -> Result<Self, CalculationError> {
        if let Some(series) = rates.series(benchmark).filter(|s| !s.is_empty()) {
            return Ok(Self {
                series,
                derive_savings: false,
            });
        }
        if benchmark == Benchmark::Savings {
            if let Some(selic) = rates.series(Benchmark::Selic).filter(|s| !s.is_empty()) {
                debug!("No savings series, deriving the yield from SELIC");
                return Ok(Self {
                    series: selic,
                    derive_savings: true,
                });
            }
        }
        Err(CalculationError::BenchmarkUnavailable { benchmark })
    }

    fn last_date(&self) -> Option<NaiveDate> {
        self.series.last().map(|p| p.date)
    }

    /// Value at `date`, extrapolated when past the last observation
    fn value_at(
        &self,
        date: NaiveDate,
        settings: &ProjectionSettings,
    ) -> Result<(Decimal, bool), CalculationError> {
        let projection = project(self.series, date, settings)?;
        let value = if self.derive_savings {
            savings_yield_from_selic(projection.value)
        } else {
            projection.value
        };
        Ok((value, projection.is_extrapolated()))
    }
}

fn compose(terms: RateTerms, benchmark_value: Decimal) -> Decimal {
    match terms {
        RateTerms::Fixed { annual_rate } => annual_rate,
        RateTerms::Spread { spread, .. } => benchmark_value + spread,
        RateTerms::Percentage { factor, .. } => benchmark_value * factor,
        RateTerms::Benchmark(_) => benchmark_value,
    }
}

/// Resolve the nominal annual rate `investment` earns from `start` to `end`
///
/// A range that crosses the last observation compounds the historical and
/// projected segments separately and reports the equivalent annual rate of
/// the combined factor.
pub fn resolve_nominal_rate(
    investment: &Investment,
    start: NaiveDate,
    end: NaiveDate,
    rates: &dyn RateSource,
    settings: &ProjectionSettings,
) -> Result<NominalRate, CalculationError> {
    if end <= start {
        return Err(CalculationError::InvalidPeriod { start, end });
    }

    let terms = investment.rate_terms();
    let benchmark = match terms {
        RateTerms::Fixed { annual_rate } => {
            return Ok(NominalRate {
                annual_rate,
                period_return: None,
                used_projection: false,
            });
        }
        RateTerms::Benchmark(Benchmark::Bitcoin) => return bitcoin_rate(start, end, rates, settings),
        RateTerms::Spread { benchmark, .. }
        | RateTerms::Percentage { benchmark, .. }
        | RateTerms::Benchmark(benchmark) => benchmark,
    };

    let view = BenchmarkView::resolve(benchmark, rates)?;
    let last = view
        .last_date()
        .ok_or(CalculationError::BenchmarkUnavailable { benchmark })?;

    if end <= last || start >= last {
        let (value, projected) = view.value_at(end, settings)?;
        return Ok(NominalRate {
            annual_rate: compose(terms, value),
            period_return: None,
            used_projection: projected,
        });
    }

    // Historical [start, last] then projected [last, end]
    let (historical, _) = view.value_at(last, settings)?;
    let (projected, _) = view.value_at(end, settings)?;
    let historical_rate = compose(terms, historical);
    let projected_rate = compose(terms, projected);

    let historical_days = (last - start).num_days();
    let projected_days = (end - last).num_days();
    let factor = (Decimal::ONE + period_rate(historical_rate, historical_days)?)
        * (Decimal::ONE + period_rate(projected_rate, projected_days)?);
    let annual_rate = annualize(factor - Decimal::ONE, historical_days + projected_days)?;

    debug!(
        "{}: {} days at {} then {} days at {} (equivalent {})",
        benchmark, historical_days, historical_rate, projected_days, projected_rate, annual_rate
    );

    Ok(NominalRate {
        annual_rate,
        period_return: None,
        used_projection: true,
    })
}

/// BTC price move between `start` and `end`, with its annualized equivalent
fn bitcoin_rate(
    start: NaiveDate,
    end: NaiveDate,
    rates: &dyn RateSource,
    settings: &ProjectionSettings,
) -> Result<NominalRate, CalculationError> {
    let view = BenchmarkView::resolve(Benchmark::Bitcoin, rates)?;
    let (start_price, start_projected) = view.value_at(start, settings)?;
    let (end_price, end_projected) = view.value_at(end, settings)?;
    if start_price <= Decimal::ZERO {
        return Err(CalculationError::BenchmarkUnavailable {
            benchmark: Benchmark::Bitcoin,
        });
    }

    let period_return = end_price
        .checked_div(start_price)
        .map(|factor| factor - Decimal::ONE)
        .ok_or_else(|| CalculationError::validation("rate", "price move overflows"))?;
    let days = (end - start).num_days();
    Ok(NominalRate {
        annual_rate: annualize_capped(period_return, days),
        period_return: Some(period_return),
        used_projection: start_projected || end_projected,
    })
}
