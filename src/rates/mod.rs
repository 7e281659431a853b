// Rates module - benchmark series and the providers that fill them

pub mod bcb;
pub mod cache;
pub mod cryptocompare;
pub mod csv_file;
pub mod fetch;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CalculationError;

/// Benchmark series the engine can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Benchmark {
    Selic,
    Cdi,
    Ipca,
    Savings,
    Bitcoin,
}

/// What the values of a series mean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Annual rate as a decimal fraction (0.1065 = 10.65% p.a.)
    Rate,
    /// Asset price in BRL
    Price,
}

/// How often upstream publishes a new point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Daily,
    Monthly,
}

impl Benchmark {
    pub const ALL: [Benchmark; 5] = [
        Benchmark::Selic,
        Benchmark::Cdi,
        Benchmark::Ipca,
        Benchmark::Savings,
        Benchmark::Bitcoin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Benchmark::Selic => "selic",
            Benchmark::Cdi => "cdi",
            Benchmark::Ipca => "ipca",
            Benchmark::Savings => "savings",
            Benchmark::Bitcoin => "bitcoin",
        }
    }

    pub fn kind(&self) -> SeriesKind {
        match self {
            Benchmark::Bitcoin => SeriesKind::Price,
            _ => SeriesKind::Rate,
        }
    }

    pub fn cadence(&self) -> Cadence {
        match self {
            Benchmark::Ipca | Benchmark::Savings => Cadence::Monthly,
            Benchmark::Selic | Benchmark::Cdi | Benchmark::Bitcoin => Cadence::Daily,
        }
    }

    /// Nominal projection lookback, before any widening
    pub fn default_lookback_days(&self) -> i64 {
        match self.cadence() {
            Cadence::Daily => 90,
            Cadence::Monthly => 365,
        }
    }
}

impl fmt::Display for Benchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Benchmark::Selic => "SELIC",
            Benchmark::Cdi => "CDI",
            Benchmark::Ipca => "IPCA",
            Benchmark::Savings => "savings yield",
            Benchmark::Bitcoin => "Bitcoin price",
        };
        f.write_str(label)
    }
}

impl FromStr for Benchmark {
    type Err = CalculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "selic" => Ok(Benchmark::Selic),
            "cdi" => Ok(Benchmark::Cdi),
            "ipca" => Ok(Benchmark::Ipca),
            "savings" | "poupanca" => Ok(Benchmark::Savings),
            "bitcoin" | "btc" => Ok(Benchmark::Bitcoin),
            other => Err(CalculationError::validation(
                "benchmark",
                format!("unknown benchmark: {}", other),
            )),
        }
    }
}

/// A single observation of a benchmark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

impl RatePoint {
    pub fn new(date: NaiveDate, value: Decimal) -> Self {
        Self { date, value }
    }
}

/// Date-ordered observations of one benchmark, without duplicate dates
#[derive(Debug, Clone, PartialEq)]
pub struct RateSeries {
    benchmark: Benchmark,
    points: Vec<RatePoint>,
}

impl RateSeries {
    pub fn new(benchmark: Benchmark, mut points: Vec<RatePoint>) -> Result<Self, CalculationError> {
        points.sort_by_key(|p| p.date);
        if let Some(pair) = points.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(CalculationError::validation(
                "rate_series",
                format!("duplicate {} observation for {}", benchmark, pair[0].date),
            ));
        }
        Ok(Self { benchmark, points })
    }

    pub fn benchmark(&self) -> Benchmark {
        self.benchmark
    }

    pub fn points(&self) -> &[RatePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&RatePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&RatePoint> {
        self.points.last()
    }

    /// Latest observation on or before `date`
    pub fn value_as_of(&self, date: NaiveDate) -> Option<&RatePoint> {
        let idx = self.points.partition_point(|p| p.date <= date);
        idx.checked_sub(1).map(|i| &self.points[i])
    }

    /// Observations dated on or after `from`
    pub fn since(&self, from: NaiveDate) -> &[RatePoint] {
        let idx = self.points.partition_point(|p| p.date < from);
        &self.points[idx..]
    }

    /// Observations within `[from, to]`
    pub fn between(&self, from: NaiveDate, to: NaiveDate) -> &[RatePoint] {
        let start = self.points.partition_point(|p| p.date < from);
        let end = self.points.partition_point(|p| p.date <= to);
        if start >= end {
            &[]
        } else {
            &self.points[start..end]
        }
    }
}

/// Read access to already-resolved series
///
/// The engine only ever sees this trait, so tests can hand it canned
/// fixtures and the CLI can hand it whatever the providers fetched.
pub trait RateSource {
    fn series(&self, benchmark: Benchmark) -> Option<&RateSeries>;
}

/// Request-scoped collection of series, one per benchmark
#[derive(Debug, Clone, Default)]
pub struct RateSeriesSet {
    series: HashMap<Benchmark, RateSeries>,
}

impl RateSeriesSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: RateSeries) {
        self.series.insert(series.benchmark(), series);
    }

    pub fn with(mut self, series: RateSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn benchmarks(&self) -> Vec<Benchmark> {
        let mut keys: Vec<Benchmark> = self.series.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl RateSource for RateSeriesSet {
    fn series(&self, benchmark: Benchmark) -> Option<&RateSeries> {
        self.series.get(&benchmark)
    }
}
