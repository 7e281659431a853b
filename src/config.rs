//! Configuration loading
//!
//! Settings live in an optional TOML file. Every key has a default, so a
//! missing file or a partial file is fine.

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.toml";
/// Upper bound for any day span in the config (100 years)
const MAX_SPAN_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub projection: ProjectionSettings,
    pub provider: ProviderSettings,
    pub fgc: FgcSettings,
}

/// Knobs for extrapolating benchmarks past their last observation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProjectionSettings {
    /// Overrides the per-benchmark nominal lookback (90 days daily, 365 monthly)
    pub lookback_days: Option<i64>,
    /// Minimum observations a window needs to yield a trend
    pub min_points: usize,
    /// Multipliers applied to the nominal lookback when the window is too sparse
    pub widening_factors: Vec<i64>,
    /// Hold the last observation flat once every window has failed
    pub last_value_fallback: bool,
    pub rate_floor: Decimal,
    pub rate_ceiling: Decimal,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            lookback_days: None,
            min_points: 3,
            widening_factors: vec![2, 4],
            last_value_fallback: true,
            rate_floor: Decimal::ZERO,
            rate_ceiling: dec!(0.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub max_concurrency: usize,
    pub cache_ttl_hours: i64,
    /// History fetched before the requested start, for projection windows
    pub history_days: i64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 4,
            backoff_base_ms: 500,
            max_concurrency: 4,
            cache_ttl_hours: 24,
            history_days: 1460,
        }
    }
}

/// Deposit-guarantee ceilings in BRL
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FgcSettings {
    pub limit_per_institution: Decimal,
    pub total_limit: Decimal,
}

impl Default for FgcSettings {
    fn default() -> Self {
        Self {
            limit_per_institution: dec!(250000),
            total_limit: dec!(1000000),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Invalid NestEgg configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load `$NESTEGG_CONFIG` or the user config file, falling back to defaults
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os("NESTEGG_CONFIG") {
            return Self::load_from(Path::new(&path));
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        let p = &self.projection;
        if p.min_points < 2 {
            return Err(anyhow!("projection.min_points must be at least 2"));
        }
        if let Some(days) = p.lookback_days {
            if !(1..=MAX_SPAN_DAYS).contains(&days) {
                return Err(anyhow!(
                    "projection.lookback_days must be between 1 and {}",
                    MAX_SPAN_DAYS
                ));
            }
        }
        if p.widening_factors.iter().any(|f| *f < 1) {
            return Err(anyhow!("projection.widening_factors must be >= 1"));
        }
        if p.rate_floor > p.rate_ceiling {
            return Err(anyhow!("projection.rate_floor exceeds rate_ceiling"));
        }
        if !(0..=MAX_SPAN_DAYS).contains(&self.provider.history_days) {
            return Err(anyhow!(
                "provider.history_days must be between 0 and {}",
                MAX_SPAN_DAYS
            ));
        }
        if self.provider.max_concurrency == 0 {
            return Err(anyhow!("provider.max_concurrency must be positive"));
        }
        if self.fgc.limit_per_institution <= Decimal::ZERO {
            return Err(anyhow!("fgc.limit_per_institution must be positive"));
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dir_spec::config_home)
        .map(|dir| dir.join("nestegg").join(CONFIG_FILENAME))
}
