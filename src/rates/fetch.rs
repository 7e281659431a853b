// Resolves the benchmark series a request needs: cache first, then upstream

use anyhow::{anyhow, Result};
use chrono::{Duration, Local, NaiveDate};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::bcb::BcbClient;
use super::cache::{CachedSeries, SeriesCache};
use super::cryptocompare::CryptoCompareClient;
use super::{Benchmark, RatePoint, RateSeries, RateSeriesSet};
use crate::config::ProviderSettings;
use crate::error::ProviderError;

#[derive(Clone)]
struct Upstream {
    bcb: BcbClient,
    crypto: CryptoCompareClient,
}

impl Upstream {
    async fn fetch(
        &self,
        benchmark: Benchmark,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RatePoint>, ProviderError> {
        match benchmark {
            Benchmark::Bitcoin => self.crypto.fetch_btc_brl(start, end).await,
            _ => self.bcb.fetch_series(benchmark, start, end).await,
        }
    }
}

/// Loads series through the disk cache, hitting upstream only when needed
pub struct RateFetcher {
    settings: ProviderSettings,
    cache: Option<Arc<SeriesCache>>,
    offline: bool,
}

impl RateFetcher {
    pub fn new(settings: ProviderSettings, offline: bool) -> Self {
        let cache = match SeriesCache::open_default() {
            Ok(cache) => Some(Arc::new(cache)),
            Err(e) => {
                warn!("Rate cache disabled: {}", e);
                None
            }
        };
        Self {
            settings,
            cache,
            offline,
        }
    }

    pub fn with_cache(mut self, cache: SeriesCache) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Resolve every benchmark in parallel
    ///
    /// Benchmarks that cannot be resolved are logged and left out of the
    /// set; the engine reports them when a calculation actually needs them.
    pub async fn load(
        &self,
        benchmarks: &[Benchmark],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RateSeriesSet> {
        self.run(benchmarks, start, end, false).await
    }

    /// Re-download every benchmark regardless of cache age
    pub async fn refresh(&self, benchmarks: &[Benchmark]) -> Result<RateSeriesSet> {
        if self.offline {
            return Err(anyhow!("Cannot refresh rates in offline mode"));
        }
        let today = Local::now().date_naive();
        self.run(benchmarks, today, today, true).await
    }

    async fn run(
        &self,
        benchmarks: &[Benchmark],
        start: NaiveDate,
        end: NaiveDate,
        force: bool,
    ) -> Result<RateSeriesSet> {
        let today = Local::now().date_naive();
        let history_start = history_start(start.min(today), self.settings.history_days);
        let fetch_end = end.min(today);

        let upstream = if self.offline {
            None
        } else {
            let timeout = std::time::Duration::from_secs(self.settings.timeout_secs);
            Some(Upstream {
                bcb: BcbClient::new(timeout)?,
                crypto: CryptoCompareClient::new(timeout)?,
            })
        };

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency));
        let mut join_set = JoinSet::new();

        for &benchmark in benchmarks {
            let permit = semaphore.clone().acquire_owned().await?;
            let cache = self.cache.clone();
            let upstream = upstream.clone();
            let settings = self.settings.clone();
            join_set.spawn(async move {
                let _permit = permit;
                let result = resolve_one(
                    benchmark,
                    history_start,
                    fetch_end,
                    cache.as_deref(),
                    upstream.as_ref(),
                    &settings,
                    force,
                )
                .await;
                (benchmark, result)
            });
        }

        let mut set = RateSeriesSet::new();
        while let Some(joined) = join_set.join_next().await {
            let (benchmark, result) = joined?;
            match result {
                Ok(series) if series.is_empty() => {
                    warn!("{} series is empty", benchmark);
                }
                Ok(series) => {
                    debug!("Resolved {} with {} points", benchmark, series.len());
                    set.insert(series);
                }
                Err(e) => {
                    warn!("Failed to load {} series: {:#}", benchmark, e);
                }
            }
        }
        Ok(set)
    }
}

async fn resolve_one(
    benchmark: Benchmark,
    start: NaiveDate,
    end: NaiveDate,
    cache: Option<&SeriesCache>,
    upstream: Option<&Upstream>,
    settings: &ProviderSettings,
    force: bool,
) -> Result<RateSeries> {
    let cached = cache.and_then(|c| c.load(benchmark));

    let Some(upstream) = upstream else {
        return match cached {
            Some(entry) => entry.to_series(),
            None => Err(ProviderError::Offline(benchmark).into()),
        };
    };

    if let Some(entry) = &cached {
        if !force
            && entry.covers(start, end)
            && !entry.is_stale(settings.cache_ttl_hours, chrono::Utc::now())
        {
            debug!("Using cached {} series", benchmark);
            return entry.to_series();
        }
    }

    let fetched = with_retry(settings, benchmark, || upstream.fetch(benchmark, start, end)).await;
    match fetched {
        Ok(points) => {
            let entry = CachedSeries::new(benchmark, start, end, points);
            if let Some(cache) = cache {
                if let Err(e) = cache.store(&entry) {
                    warn!("Failed to cache {} series: {:#}", benchmark, e);
                }
            }
            info!("Fetched {} {} points", entry.points.len(), benchmark);
            entry.to_series()
        }
        Err(e) => match cached {
            Some(entry) => {
                warn!("Using stale {} cache after fetch failure: {}", benchmark, e);
                entry.to_series()
            }
            None => Err(e.into()),
        },
    }
}

/// `anchor` moved back by `history_days`, kept at `anchor` when that leaves the calendar
fn history_start(anchor: NaiveDate, history_days: i64) -> NaiveDate {
    Duration::try_days(history_days.max(0))
        .and_then(|span| anchor.checked_sub_signed(span))
        .unwrap_or(anchor)
}

fn backoff_delay(base_ms: u64, attempt: u32) -> std::time::Duration {
    std::time::Duration::from_millis(base_ms.saturating_mul(1u64 << attempt.min(10)))
}

/// Retry `op` with exponential backoff while its error is retryable
pub async fn with_retry<T, F, Fut>(
    settings: &ProviderSettings,
    benchmark: Benchmark,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < settings.max_retries => {
                let delay = backoff_delay(settings.backoff_base_ms, attempt);
                warn!(
                    "Fetching {} failed ({}), retrying in {}ms",
                    benchmark,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    fn fast_settings() -> ProviderSettings {
        ProviderSettings {
            max_retries: 3,
            backoff_base_ms: 1,
            ..ProviderSettings::default()
        }
    }

    #[test]
    fn test_history_start_stays_in_calendar() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(
            history_start(day, 365),
            NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
        );
        assert_eq!(history_start(day, -10), day);
        assert_eq!(history_start(day, i64::MAX), day);
        assert_eq!(history_start(day, 1_000_000_000), day);
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        assert_eq!(backoff_delay(500, 0).as_millis(), 500);
        assert_eq!(backoff_delay(500, 1).as_millis(), 1000);
        assert_eq!(backoff_delay(500, 3).as_millis(), 4000);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_status() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(&fast_settings(), Benchmark::Selic, move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ProviderError::Status {
                    provider: "BCB",
                    status: 503,
                })
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_on_permanent_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(&fast_settings(), Benchmark::Cdi, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::ParseError("bad body".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_stops_after_max_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(&fast_settings(), Benchmark::Cdi, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Status {
                provider: "BCB",
                status: 429,
            })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_offline_load_reads_cache_only() {
        let dir = TempDir::new().unwrap();
        let cache = SeriesCache::at(dir.path());
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        cache
            .store(&CachedSeries::new(
                Benchmark::Selic,
                day,
                day,
                vec![RatePoint::new(day, dec!(0.1165))],
            ))
            .unwrap();

        let fetcher = RateFetcher::new(ProviderSettings::default(), true).with_cache(cache);
        let set = fetcher
            .load(&[Benchmark::Selic, Benchmark::Ipca], day, day + Duration::days(30))
            .await
            .unwrap();
        assert_eq!(set.benchmarks(), vec![Benchmark::Selic]);
        assert!(fetcher.refresh(&[Benchmark::Selic]).await.is_err());
    }
}
