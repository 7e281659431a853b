// CryptoCompare client for daily BTC/BRL closes

use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use super::RatePoint;
use crate::error::ProviderError;

const HISTODAY_URL: &str = "https://min-api.cryptocompare.com/data/v2/histoday";
const PAGE_LIMIT: i64 = 2000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HistodayResponse {
    response: String,
    #[serde(default)]
    message: String,
    data: Option<HistodayData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HistodayData {
    #[serde(default)]
    data: Vec<HistodayCandle>,
}

#[derive(Debug, Deserialize)]
struct HistodayCandle {
    time: i64,
    close: f64,
}

#[derive(Clone)]
pub struct CryptoCompareClient {
    client: Client,
}

impl CryptoCompareClient {
    pub fn new(timeout: std::time::Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; NestEggBot/1.0)")
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Daily BTC closes in BRL covering `[start, end]`
    ///
    /// Pages backwards from `end` until the oldest candle precedes `start`.
    pub async fn fetch_btc_brl(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RatePoint>, ProviderError> {
        info!("Fetching BTC/BRL daily closes from {} to {}", start, end);

        let start_ts = day_timestamp(start);
        let mut to_ts = day_timestamp(end);
        let mut points: Vec<RatePoint> = Vec::new();

        loop {
            let url = format!(
                "{}?fsym=BTC&tsym=BRL&limit={}&toTs={}",
                HISTODAY_URL, PAGE_LIMIT, to_ts
            );
            debug!("Requesting {}", url);

            let response = self.client.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ProviderError::Status {
                    provider: "CryptoCompare",
                    status: status.as_u16(),
                });
            }
            let body = response.text().await?;
            let page = parse_histoday(&body)?;

            let Some(oldest) = page.first().map(|p| p.date) else {
                break;
            };
            points.extend(page);

            let oldest_ts = day_timestamp(oldest);
            if oldest_ts <= start_ts || oldest_ts >= to_ts {
                break;
            }
            to_ts = oldest_ts - 86_400;
        }

        points.retain(|p| p.date >= start && p.date <= end);
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Ok(points)
    }
}

fn day_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Parse a histoday body, skipping empty candles from before the pair traded
pub fn parse_histoday(body: &str) -> Result<Vec<RatePoint>, ProviderError> {
    let response: HistodayResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::ParseError(format!("invalid CryptoCompare payload: {}", e)))?;

    if response.response != "Success" {
        return Err(ProviderError::ParseError(format!(
            "CryptoCompare error: {}",
            response.message
        )));
    }

    let candles = response.data.map(|d| d.data).unwrap_or_default();
    let mut points = Vec::with_capacity(candles.len());
    for candle in candles {
        if candle.close <= 0.0 {
            continue;
        }
        let date = DateTime::from_timestamp(candle.time, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| ProviderError::ParseError(format!("invalid timestamp: {}", candle.time)))?;
        let close = Decimal::from_f64_retain(candle.close)
            .ok_or_else(|| ProviderError::ParseError(format!("invalid close: {}", candle.close)))?;
        points.push(RatePoint::new(date, close.round_dp(2)));
    }
    Ok(points)
}
