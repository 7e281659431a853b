// Banco Central do Brasil SGS time-series client

use chrono::{Duration, NaiveDate};
use reqwest::Client;
use rust_decimal::prelude::*;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, info};

use super::{Benchmark, RatePoint};
use crate::error::ProviderError;

const SGS_URL: &str = "https://api.bcb.gov.br/dados/serie/bcdata.sgs";

/// SGS refuses daily ranges longer than ten years per request
const MAX_RANGE_DAYS: i64 = 3650;

const BUSINESS_DAYS_IN_YEAR: i64 = 252;
const MONTHS_IN_YEAR: i64 = 12;

#[derive(Debug, Deserialize)]
struct SgsObservation {
    data: String,
    valor: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SgsResponse {
    Observations(Vec<SgsObservation>),
    Error { erro: serde_json::Value },
}

/// SGS series code for a benchmark, if the central bank publishes it
pub fn series_code(benchmark: Benchmark) -> Option<u32> {
    match benchmark {
        Benchmark::Selic => Some(11),
        Benchmark::Cdi => Some(12),
        Benchmark::Ipca => Some(433),
        Benchmark::Savings => Some(195),
        Benchmark::Bitcoin => None,
    }
}

#[derive(Clone)]
pub struct BcbClient {
    client: Client,
}

impl BcbClient {
    pub fn new(timeout: std::time::Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; NestEggBot/1.0)")
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch `[start, end]` of a series as annual fractions
    pub async fn fetch_series(
        &self,
        benchmark: Benchmark,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RatePoint>, ProviderError> {
        let code = series_code(benchmark).ok_or_else(|| {
            ProviderError::ParseError(format!("{} is not published by the central bank", benchmark))
        })?;

        info!("Fetching {} (SGS {}) from {} to {}", benchmark, code, start, end);

        let mut points = Vec::new();
        for (chunk_start, chunk_end) in chunk_ranges(start, end) {
            let url = build_url(code, chunk_start, chunk_end);
            debug!("Requesting {}", url);

            let response = self.client.get(&url).send().await?;
            let status = response.status();
            // SGS answers 404 for ranges with no observations
            if status.as_u16() == 404 {
                debug!("No {} observations between {} and {}", benchmark, chunk_start, chunk_end);
                continue;
            }
            if !status.is_success() {
                return Err(ProviderError::Status {
                    provider: "BCB",
                    status: status.as_u16(),
                });
            }

            let body = response.text().await?;
            points.extend(parse_response(benchmark, &body)?);
        }

        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Ok(points)
    }
}

fn build_url(code: u32, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{}.{}/dados?formato=json&dataInicial={}&dataFinal={}",
        SGS_URL,
        code,
        start.format("%d/%m/%Y"),
        end.format("%d/%m/%Y")
    )
}

/// Split a date range into consecutive chunks SGS will accept
fn chunk_ranges(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut chunks = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let chunk_end = (cursor + Duration::days(MAX_RANGE_DAYS - 1)).min(end);
        chunks.push((cursor, chunk_end));
        cursor = chunk_end + Duration::days(1);
    }
    chunks
}

/// Parse an SGS JSON body into annualized observations
pub fn parse_response(benchmark: Benchmark, body: &str) -> Result<Vec<RatePoint>, ProviderError> {
    let response: SgsResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::ParseError(format!("invalid SGS payload: {}", e)))?;

    let observations = match response {
        SgsResponse::Observations(obs) => obs,
        SgsResponse::Error { erro } => {
            return Err(ProviderError::ParseError(format!("SGS error: {}", erro)));
        }
    };

    observations
        .iter()
        .map(|obs| {
            let date = NaiveDate::parse_from_str(obs.data.trim(), "%d/%m/%Y")
                .map_err(|_| ProviderError::ParseError(format!("invalid SGS date: {}", obs.data)))?;
            let published = parse_sgs_value(&obs.valor)?;
            Ok(RatePoint::new(date, annualize_published(benchmark, published)?))
        })
        .collect()
}

/// SGS sometimes uses a comma as decimal separator; there are no thousands separators
fn parse_sgs_value(raw: &str) -> Result<Decimal, ProviderError> {
    let normalized = raw.trim().replace(',', ".");
    Decimal::from_str(&normalized)
        .map_err(|_| ProviderError::ParseError(format!("invalid SGS value: {}", raw)))
}

/// Convert a published per-period percentage to an annual fraction
///
/// Daily series compound over 252 business days, monthly series over 12 months.
fn annualize_published(benchmark: Benchmark, percent: Decimal) -> Result<Decimal, ProviderError> {
    let periods = match benchmark.cadence() {
        super::Cadence::Daily => BUSINESS_DAYS_IN_YEAR,
        super::Cadence::Monthly => MONTHS_IN_YEAR,
    };
    let growth = Decimal::ONE + percent / Decimal::ONE_HUNDRED;
    let annual = growth.checked_powi(periods).ok_or_else(|| {
        ProviderError::ParseError(format!("SGS value {} does not annualize", percent))
    })?;
    Ok((annual - Decimal::ONE).round_dp(10))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_series_codes() {
        assert_eq!(series_code(Benchmark::Selic), Some(11));
        assert_eq!(series_code(Benchmark::Cdi), Some(12));
        assert_eq!(series_code(Benchmark::Ipca), Some(433));
        assert_eq!(series_code(Benchmark::Savings), Some(195));
        assert_eq!(series_code(Benchmark::Bitcoin), None);
    }

    #[test]
    fn test_build_url_uses_brazilian_dates() {
        let url = build_url(11, d(2024, 1, 2), d(2024, 3, 31));
        assert_eq!(
            url,
            "https://api.bcb.gov.br/dados/serie/bcdata.sgs.11/dados?formato=json&dataInicial=02/01/2024&dataFinal=31/03/2024"
        );
    }

    #[test]
    fn test_chunk_ranges_split_long_requests() {
        let chunks = chunk_ranges(d(2000, 1, 1), d(2024, 12, 31));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].0, d(2000, 1, 1));
        assert_eq!(chunks[2].1, d(2024, 12, 31));
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].1 + Duration::days(1), pair[1].0);
        }

        let single = chunk_ranges(d(2024, 1, 1), d(2024, 6, 1));
        assert_eq!(single, vec![(d(2024, 1, 1), d(2024, 6, 1))]);
    }

    #[test]
    fn test_parse_daily_series_annualizes_over_business_days() {
        let body = r#"[{"data":"02/01/2024","valor":"0.043739"},{"data":"03/01/2024","valor":"0,043739"}]"#;
        let points = parse_response(Benchmark::Selic, body).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, d(2024, 1, 2));
        // 0.043739% a day is roughly 11.65% a year
        assert!(points[0].value > dec!(0.1160) && points[0].value < dec!(0.1170));
        assert_eq!(points[0].value, points[1].value);
    }

    #[test]
    fn test_parse_monthly_series_annualizes_over_months() {
        let body = r#"[{"data":"01/01/2024","valor":"0.42"}]"#;
        let points = parse_response(Benchmark::Ipca, body).unwrap();
        // (1.0042)^12 - 1
        assert!(points[0].value > dec!(0.0515) && points[0].value < dec!(0.0516));
    }

    #[test]
    fn test_parse_error_payload() {
        let body = r#"{"erro":{"code":500,"message":"Value(s) not found"}}"#;
        assert!(matches!(
            parse_response(Benchmark::Cdi, body),
            Err(ProviderError::ParseError(_))
        ));
        assert!(parse_response(Benchmark::Cdi, "not json").is_err());
        assert!(parse_response(Benchmark::Cdi, r#"[{"data":"2024-01-01","valor":"1"}]"#).is_err());
    }

    #[test]
    fn test_unannualizable_value_is_a_parse_error() {
        let body = r#"[{"data":"01/01/2024","valor":"1000"}]"#;
        assert!(matches!(
            parse_response(Benchmark::Cdi, body),
            Err(ProviderError::ParseError(_))
        ));
        // 1000% a month still fits once compounded over 12 months
        assert!(parse_response(Benchmark::Ipca, body).is_ok());
    }

    fn should_skip_online_tests() -> bool {
        std::env::var("NESTEGG_SKIP_ONLINE_TESTS")
            .map(|v| v != "0")
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_fetch_selic_online() {
        if should_skip_online_tests() {
            return;
        }

        let client = BcbClient::new(std::time::Duration::from_secs(30)).unwrap();
        let result = client
            .fetch_series(Benchmark::Selic, d(2024, 1, 1), d(2024, 1, 31))
            .await;
        let points = match result {
            Ok(points) => points,
            Err(e) => {
                eprintln!("Skipping BCB SELIC test: {}", e);
                return;
            }
        };

        assert!(!points.is_empty());
        assert!(points.iter().all(|p| p.value > Decimal::ZERO && p.value < dec!(0.5)));
    }
}
