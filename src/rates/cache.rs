// On-disk cache of fetched benchmark series

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{Benchmark, RatePoint, RateSeries};

/// A fetched series plus the range it was requested for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSeries {
    pub benchmark: Benchmark,
    pub fetched_at: DateTime<Utc>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub points: Vec<RatePoint>,
}

impl CachedSeries {
    pub fn new(benchmark: Benchmark, start: NaiveDate, end: NaiveDate, points: Vec<RatePoint>) -> Self {
        Self {
            benchmark,
            fetched_at: Utc::now(),
            start,
            end,
            points,
        }
    }

    pub fn is_stale(&self, ttl_hours: i64, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.fetched_at) > Duration::hours(ttl_hours)
    }

    /// Whether the cached request range contains `[start, end]`
    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start <= start && self.end >= end
    }

    pub fn to_series(&self) -> Result<RateSeries> {
        RateSeries::new(self.benchmark, self.points.clone())
            .map_err(|e| anyhow!("Corrupt {} cache: {}", self.benchmark, e))
    }
}

pub fn get_rates_cache_dir() -> Result<PathBuf> {
    let cache_dir = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(dir_spec::cache_home)
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?;
    Ok(cache_dir.join("nestegg").join("rates"))
}

pub struct SeriesCache {
    dir: PathBuf,
}

impl SeriesCache {
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(get_rates_cache_dir()?))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, benchmark: Benchmark) -> PathBuf {
        self.dir.join(format!("{}.json", benchmark.as_str()))
    }

    /// Cached entry for a benchmark; unreadable files count as a miss
    pub fn load(&self, benchmark: Benchmark) -> Option<CachedSeries> {
        let path = self.path_for(benchmark);
        if !path.exists() {
            return None;
        }
        let parsed = fs::read_to_string(&path)
            .context("Failed to read rate cache")
            .and_then(|content| {
                serde_json::from_str::<CachedSeries>(&content).context("Failed to parse rate cache")
            });
        match parsed {
            Ok(entry) if entry.benchmark == benchmark => {
                debug!("Loaded {} cache with {} points", benchmark, entry.points.len());
                Some(entry)
            }
            Ok(_) => {
                warn!("Ignoring {} cache: benchmark mismatch", benchmark);
                None
            }
            Err(e) => {
                warn!("Ignoring {} cache at {}: {:#}", benchmark, path.display(), e);
                None
            }
        }
    }

    pub fn store(&self, entry: &CachedSeries) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).context("Failed to create rate cache directory")?;
        let path = self.path_for(entry.benchmark);
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string(entry).context("Failed to serialize rate cache")?;
        fs::write(&tmp_path, content).context("Failed to write rate cache")?;
        fs::rename(&tmp_path, &path).context("Failed to finalize rate cache file")?;
        Ok(path)
    }
}
