// Offline rate series from a semicolon-separated file
//
// Each row is `benchmark;date;value`. Rates are annual fractions
// (0.1065 for 10.65% a year), Bitcoin rows are BRL prices. An optional
// `benchmark;date;value` header row and `#` comment lines are allowed.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use super::{Benchmark, RatePoint, RateSeries, RateSeriesSet};

pub fn load_rates_file(path: &Path) -> Result<RateSeriesSet> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open rates file {}", path.display()))?;
    let set = parse_rates_csv(file)
        .with_context(|| format!("Failed to load rates file {}", path.display()))?;
    info!(
        "Loaded {} benchmark series from {}",
        set.benchmarks().len(),
        path.display()
    );
    Ok(set)
}

pub fn parse_rates_csv<R: Read>(reader: R) -> Result<RateSeriesSet> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut grouped: BTreeMap<Benchmark, Vec<RatePoint>> = BTreeMap::new();

    for (idx, result) in csv_reader.records().enumerate() {
        let record = result?;
        let line = idx + 1;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        if line == 1 && record.get(0).is_some_and(|f| f.eq_ignore_ascii_case("benchmark")) {
            continue;
        }
        if record.len() != 3 {
            return Err(anyhow!(
                "Row {}: expected 3 fields (benchmark;date;value), found {}",
                line,
                record.len()
            ));
        }

        let benchmark = Benchmark::from_str(&record[0]).map_err(|e| anyhow!("Row {}: {}", line, e))?;
        let date = parse_date(&record[1]).with_context(|| format!("Row {}", line))?;
        let value = Decimal::from_str(&record[2].replace(',', "."))
            .with_context(|| format!("Row {}: invalid value '{}'", line, &record[2]))?;

        grouped.entry(benchmark).or_default().push(RatePoint::new(date, value));
    }

    let mut set = RateSeriesSet::new();
    for (benchmark, points) in grouped {
        let series = RateSeries::new(benchmark, points).map_err(|e| anyhow!("{}", e))?;
        set.insert(series);
    }
    Ok(set)
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .with_context(|| format!("invalid date '{}'", value))
}
