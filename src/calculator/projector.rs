//! Extrapolation of benchmark series past their last observation
//!
//! The projector looks at a trailing window of observations ending at the
//! last point, measures the mean period-over-period change (trend) and its
//! standard deviation (volatility), and carries the last value forward with
//! the trend damped by its signal-to-noise ratio:
//!
//! ```text
//! effective_trend = trend * |trend| / (|trend| + volatility)
//! ```
//!
//! Rate series move by absolute differences and are clamped to the
//! configured floor and ceiling. Price series move by relative changes and
//! compound. When the nominal window is too sparse it is widened by the
//! configured factors, then the last value is held flat; only a series with
//! no observations at all is unavailable.

use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::config::ProjectionSettings;
use crate::error::CalculationError;
use crate::rates::{RatePoint, RateSeries, SeriesKind};

/// Which step of the fallback chain produced a projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "level")]
pub enum FallbackLevel {
    /// Target is within history, no extrapolation needed
    Historical,
    Nominal { lookback_days: i64 },
    Widened { lookback_days: i64 },
    LastValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub base_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_value: Decimal,
    pub target_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub trend: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub volatility: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub effective_trend: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub periods_ahead: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub window_points: usize,
    pub fallback: FallbackLevel,
}

impl Projection {
    pub fn is_extrapolated(&self) -> bool {
        self.fallback != FallbackLevel::Historical
    }
}

struct WindowStats {
    trend: Decimal,
    volatility: Decimal,
    spacing_days: Decimal,
}

fn period_changes(kind: SeriesKind, window: &[RatePoint]) -> Vec<Decimal> {
    window
        .windows(2)
        .filter_map(|pair| match kind {
            SeriesKind::Rate => Some(pair[1].value - pair[0].value),
            SeriesKind::Price if pair[0].value > Decimal::ZERO => {
                Some((pair[1].value - pair[0].value) / pair[0].value)
            }
            SeriesKind::Price => None,
        })
        .collect()
}

fn window_stats(kind: SeriesKind, window: &[RatePoint]) -> Option<WindowStats> {
    let (first, last) = (window.first()?, window.last()?);
    let changes = period_changes(kind, window);
    if changes.is_empty() {
        return None;
    }

    let n = Decimal::from(changes.len());
    let trend = changes.iter().sum::<Decimal>() / n;
    let variance = changes
        .iter()
        .map(|c| (*c - trend) * (*c - trend))
        .sum::<Decimal>()
        / n;
    let volatility = variance.sqrt().unwrap_or(Decimal::ZERO);
    let spacing_days = Decimal::from((last.date - first.date).num_days()) / n;

    Some(WindowStats {
        trend,
        volatility,
        spacing_days,
    })
}

fn damped_trend(trend: Decimal, volatility: Decimal) -> Decimal {
    let magnitude = trend.abs();
    if magnitude.is_zero() {
        return Decimal::ZERO;
    }
    trend * magnitude / (magnitude + volatility)
}

fn lookback_candidates(nominal: i64, settings: &ProjectionSettings) -> Vec<(i64, FallbackLevel)> {
    let mut candidates = vec![(
        nominal,
        FallbackLevel::Nominal {
            lookback_days: nominal,
        },
    )];
    for factor in &settings.widening_factors {
        let Some(widened) = nominal.checked_mul(*factor) else {
            continue;
        };
        candidates.push((
            widened,
            FallbackLevel::Widened {
                lookback_days: widened,
            },
        ));
    }
    candidates
}

/// First day of a window ending at `end`, `None` when out of calendar range
fn window_start(end: NaiveDate, lookback_days: i64) -> Option<NaiveDate> {
    if lookback_days <= 0 {
        return None;
    }
    end.checked_sub_signed(Duration::try_days(lookback_days)?)
}

/// Project `series` to `target`
///
/// Targets on or before the last observation return the value as of the
/// target without extrapolating.
pub fn project(
    series: &RateSeries,
    target: NaiveDate,
    settings: &ProjectionSettings,
) -> Result<Projection, CalculationError> {
    let benchmark = series.benchmark();
    let unavailable = || CalculationError::BenchmarkUnavailable { benchmark };
    let last = *series.last().ok_or_else(unavailable)?;

    if target <= last.date {
        let point = series.value_as_of(target).ok_or_else(unavailable)?;
        return Ok(Projection {
            base_date: point.date,
            base_value: point.value,
            target_date: target,
            trend: Decimal::ZERO,
            volatility: Decimal::ZERO,
            effective_trend: Decimal::ZERO,
            periods_ahead: Decimal::ZERO,
            value: point.value,
            window_points: 1,
            fallback: FallbackLevel::Historical,
        });
    }

    let kind = benchmark.kind();
    let days_ahead = Decimal::from((target - last.date).num_days());
    let nominal = settings
        .lookback_days
        .unwrap_or_else(|| benchmark.default_lookback_days());

    for (lookback, level) in lookback_candidates(nominal, settings) {
        let Some(from) = window_start(last.date, lookback) else {
            debug!("{} lookback of {} days is out of range", benchmark, lookback);
            continue;
        };
        let window = series.between(from, last.date);
        if window.len() < settings.min_points {
            debug!(
                "{} window of {} days has {} points, need {}",
                benchmark,
                lookback,
                window.len(),
                settings.min_points
            );
            continue;
        }
        let Some(stats) = window_stats(kind, window) else {
            continue;
        };
        if stats.spacing_days <= Decimal::ZERO {
            continue;
        }

        let periods_ahead = days_ahead / stats.spacing_days;
        let effective_trend = damped_trend(stats.trend, stats.volatility);
        let value = extrapolate(kind, last.value, effective_trend, periods_ahead, settings)
            .ok_or_else(|| CalculationError::validation("projection", "projected value overflows"))?;

        debug!(
            "Projected {} to {} at {} ({:?}, trend {}, volatility {})",
            benchmark, target, value, level, stats.trend, stats.volatility
        );

        return Ok(Projection {
            base_date: last.date,
            base_value: last.value,
            target_date: target,
            trend: stats.trend,
            volatility: stats.volatility,
            effective_trend,
            periods_ahead,
            value,
            window_points: window.len(),
            fallback: level,
        });
    }

    if !settings.last_value_fallback {
        return Err(unavailable());
    }

    debug!("Holding last {} value {} flat to {}", benchmark, last.value, target);
    Ok(Projection {
        base_date: last.date,
        base_value: last.value,
        target_date: target,
        trend: Decimal::ZERO,
        volatility: Decimal::ZERO,
        effective_trend: Decimal::ZERO,
        periods_ahead: days_ahead,
        value: last.value,
        window_points: 1,
        fallback: FallbackLevel::LastValue,
    })
}

fn extrapolate(
    kind: SeriesKind,
    base: Decimal,
    effective_trend: Decimal,
    periods_ahead: Decimal,
    settings: &ProjectionSettings,
) -> Option<Decimal> {
    match kind {
        SeriesKind::Rate => {
            let raw = base.checked_add(effective_trend.checked_mul(periods_ahead)?)?;
            Some(raw.clamp(settings.rate_floor, settings.rate_ceiling).round_dp(10))
        }
        SeriesKind::Price => {
            // A single period can at most wipe out the price, never flip its sign
            let step = (Decimal::ONE + effective_trend).max(Decimal::new(1, 4));
            let growth = step.checked_powd(periods_ahead)?;
            Some(base.checked_mul(growth)?.max(Decimal::new(1, 2)).round_dp(10))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::Benchmark;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn monthly(benchmark: Benchmark, values: &[Decimal]) -> RateSeries {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| RatePoint::new(d(2024, 1 + i as u32, 1), *v))
            .collect();
        RateSeries::new(benchmark, points).unwrap()
    }

    #[test]
    fn test_target_within_history_is_not_extrapolated() {
        let series = monthly(Benchmark::Ipca, &[dec!(0.04), dec!(0.05), dec!(0.06)]);
        let p = project(&series, d(2024, 2, 15), &ProjectionSettings::default()).unwrap();
        assert_eq!(p.value, dec!(0.05));
        assert!(!p.is_extrapolated());
    }

    #[test]
    fn test_constant_series_projects_flat() {
        let series = monthly(Benchmark::Ipca, &[dec!(0.045); 6]);
        let p = project(&series, d(2025, 6, 1), &ProjectionSettings::default()).unwrap();
        assert_eq!(p.trend, Decimal::ZERO);
        assert_eq!(p.value, dec!(0.045));
        assert!(matches!(p.fallback, FallbackLevel::Nominal { lookback_days: 365 }));
    }

    #[test]
    fn test_steady_trend_is_followed_without_damping() {
        // Zero volatility leaves the trend intact
        let series = monthly(
            Benchmark::Ipca,
            &[dec!(0.040), dec!(0.041), dec!(0.042), dec!(0.043)],
        );
        let p = project(&series, d(2024, 7, 1), &ProjectionSettings::default()).unwrap();
        assert_eq!(p.trend, dec!(0.001));
        assert_eq!(p.volatility, Decimal::ZERO);
        assert_eq!(p.effective_trend, dec!(0.001));
        assert!(p.value > dec!(0.0435) && p.value < dec!(0.0465));
    }

    #[test]
    fn test_noisy_trend_is_damped() {
        let series = monthly(
            Benchmark::Ipca,
            &[dec!(0.040), dec!(0.050), dec!(0.042), dec!(0.055), dec!(0.048)],
        );
        let p = project(&series, d(2025, 5, 1), &ProjectionSettings::default()).unwrap();
        assert!(p.volatility > Decimal::ZERO);
        assert!(p.effective_trend.abs() < p.trend.abs());
    }

    #[test]
    fn test_rates_are_clamped_to_floor_and_ceiling() {
        let falling = monthly(Benchmark::Ipca, &[dec!(0.06), dec!(0.04), dec!(0.02)]);
        let p = project(&falling, d(2030, 1, 1), &ProjectionSettings::default()).unwrap();
        assert_eq!(p.value, Decimal::ZERO);

        let rising = monthly(Benchmark::Selic, &[dec!(0.30), dec!(0.40), dec!(0.50)]);
        let p = project(&rising, d(2030, 1, 1), &ProjectionSettings::default()).unwrap();
        assert_eq!(p.value, dec!(0.5));
    }

    #[test]
    fn test_sparse_series_widens_then_holds_last_value() {
        // The nominal 365-day window only reaches back to 2023-01-01
        let points = vec![
            RatePoint::new(d(2022, 1, 1), dec!(0.05)),
            RatePoint::new(d(2023, 1, 1), dec!(0.06)),
            RatePoint::new(d(2023, 7, 1), dec!(0.065)),
            RatePoint::new(d(2024, 1, 1), dec!(0.07)),
        ];
        let series = RateSeries::new(Benchmark::Ipca, points).unwrap();

        let settings = ProjectionSettings {
            min_points: 4,
            ..ProjectionSettings::default()
        };
        let p = project(&series, d(2024, 6, 1), &settings).unwrap();
        assert!(matches!(p.fallback, FallbackLevel::Widened { lookback_days: 730 }));
        assert_eq!(p.window_points, 4);

        let strict = ProjectionSettings {
            min_points: 10,
            ..ProjectionSettings::default()
        };
        let p = project(&series, d(2024, 6, 1), &strict).unwrap();
        assert_eq!(p.fallback, FallbackLevel::LastValue);
        assert_eq!(p.value, dec!(0.07));

        let no_fallback = ProjectionSettings {
            min_points: 10,
            last_value_fallback: false,
            ..ProjectionSettings::default()
        };
        assert!(matches!(
            project(&series, d(2024, 6, 1), &no_fallback),
            Err(CalculationError::BenchmarkUnavailable { .. })
        ));
    }

    #[test]
    fn test_out_of_range_lookbacks_fall_through() {
        let series = monthly(Benchmark::Ipca, &[dec!(0.045); 6]);
        let settings = ProjectionSettings {
            lookback_days: Some(1_000_000_000),
            widening_factors: vec![i64::MAX],
            ..ProjectionSettings::default()
        };
        let p = project(&series, d(2025, 6, 1), &settings).unwrap();
        assert_eq!(p.fallback, FallbackLevel::LastValue);
        assert_eq!(p.value, dec!(0.045));

        let negative = ProjectionSettings {
            lookback_days: Some(-365),
            ..ProjectionSettings::default()
        };
        let p = project(&series, d(2025, 6, 1), &negative).unwrap();
        assert_eq!(p.fallback, FallbackLevel::LastValue);
    }

    #[test]
    fn test_empty_series_is_unavailable() {
        let series = RateSeries::new(Benchmark::Cdi, vec![]).unwrap();
        assert!(matches!(
            project(&series, d(2024, 6, 1), &ProjectionSettings::default()),
            Err(CalculationError::BenchmarkUnavailable {
                benchmark: Benchmark::Cdi
            })
        ));
    }

    #[test]
    fn test_price_series_compounds_relative_changes() {
        let points = (0..10)
            .map(|i| {
                RatePoint::new(
                    d(2024, 1, 1) + Duration::days(i),
                    dec!(100000) * (Decimal::ONE + dec!(0.01) * Decimal::from(i)),
                )
            })
            .collect();
        let series = RateSeries::new(Benchmark::Bitcoin, points).unwrap();
        let p = project(&series, d(2024, 1, 20), &ProjectionSettings::default()).unwrap();
        assert!(p.trend > Decimal::ZERO);
        assert!(p.value > p.base_value);
    }

    #[test]
    fn test_projection_is_deterministic() {
        let series = monthly(
            Benchmark::Ipca,
            &[dec!(0.040), dec!(0.050), dec!(0.042), dec!(0.055), dec!(0.048)],
        );
        let settings = ProjectionSettings::default();
        let a = project(&series, d(2026, 3, 1), &settings).unwrap();
        let b = project(&series, d(2026, 3, 1), &settings).unwrap();
        assert_eq!(a, b);
    }
}
