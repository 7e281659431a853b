use chrono::NaiveDate;
use clap::{builder::FalseyValueParser, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

use crate::investments::RateParams;

pub mod formatters;

#[derive(Parser, Debug)]
#[command(name = "nestegg")]
#[command(
    version,
    about = "Brazilian fixed-income and crypto return calculator with tax and FGC rules"
)]
#[command(
    long_about = "Compare CDB, LCI/LCA, Tesouro Direto, savings and Bitcoin over a period: gross return from historical or projected benchmark rates, regressive income tax and IOF, crypto capital gains, and FGC deposit insurance coverage."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Read benchmark series from a `benchmark;date;value` file instead of the providers
    #[arg(long = "rates-file", global = true, env = "NESTEGG_RATES_FILE")]
    pub rates_file: Option<PathBuf>,

    /// Never hit the network; use cached series only
    #[arg(
        long,
        global = true,
        env = "NESTEGG_OFFLINE",
        value_parser = FalseyValueParser::new()
    )]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Per-variant rate parameters, all in percent
#[derive(Args, Debug, Clone, Default)]
pub struct RateArgs {
    /// Fixed annual rate used when no variant-specific rate is given
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// CDB fixed annual rate
    #[arg(long = "cdb-rate")]
    pub cdb_rate: Option<Decimal>,

    /// LCI fixed annual rate
    #[arg(long = "lci-rate")]
    pub lci_rate: Option<Decimal>,

    /// LCA fixed annual rate
    #[arg(long = "lca-rate")]
    pub lca_rate: Option<Decimal>,

    /// Spread over IPCA
    #[arg(long = "ipca-spread")]
    pub ipca_spread: Option<Decimal>,

    /// Spread over SELIC
    #[arg(long = "selic-spread")]
    pub selic_spread: Option<Decimal>,

    /// Percentage of CDI (e.g. 110)
    #[arg(long = "cdi-percentage")]
    pub cdi_percentage: Option<Decimal>,
}

impl From<&RateArgs> for RateParams {
    fn from(args: &RateArgs) -> Self {
        RateParams {
            rate: args.rate,
            cdb_rate: args.cdb_rate,
            lci_rate: args.lci_rate,
            lca_rate: args.lca_rate,
            ipca_spread: args.ipca_spread,
            selic_spread: args.selic_spread,
            cdi_percentage: args.cdi_percentage,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Calculate the return of a single investment
    Calculate {
        /// Investment type id (see `nestegg investment-types`)
        #[arg(long = "investment-type")]
        investment_type: String,

        /// Initial amount in BRL
        #[arg(long, allow_negative_numbers = true)]
        amount: Decimal,

        /// Start date (YYYY-MM-DD)
        #[arg(long = "start-date")]
        start_date: NaiveDate,

        /// End date (YYYY-MM-DD)
        #[arg(long = "end-date")]
        end_date: NaiveDate,

        #[command(flatten)]
        rates: RateArgs,
    },

    /// Compare several investments over the same period, best first
    Compare {
        /// Initial amount in BRL
        #[arg(long, allow_negative_numbers = true)]
        amount: Decimal,

        /// Start date (YYYY-MM-DD)
        #[arg(long = "start-date", conflicts_with = "period")]
        start_date: Option<NaiveDate>,

        /// End date (YYYY-MM-DD)
        #[arg(long = "end-date", conflicts_with = "period")]
        end_date: Option<NaiveDate>,

        /// Period in years starting today (e.g. 1.5)
        #[arg(long, allow_negative_numbers = true)]
        period: Option<Decimal>,

        #[command(flatten)]
        rates: RateArgs,

        /// Include savings (poupança)
        #[arg(long = "include-poupanca")]
        include_poupanca: bool,

        /// Include Tesouro SELIC with no spread
        #[arg(long = "include-selic")]
        include_selic: bool,

        /// Include a CDB paying 100% of CDI
        #[arg(long = "include-cdi")]
        include_cdi: bool,

        /// Include Bitcoin
        #[arg(long = "include-btc")]
        include_btc: bool,
    },

    /// List supported investment types
    InvestmentTypes,

    /// Benchmark series management
    Rates {
        #[command(subcommand)]
        action: RatesCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum RatesCommands {
    /// Show the latest observations of a benchmark and its projection
    Show {
        /// Benchmark: selic, cdi, ipca, savings or bitcoin
        benchmark: String,

        /// Number of trailing observations to display
        #[arg(long, default_value_t = 10)]
        tail: usize,

        /// Projection target date (default: one year from today)
        #[arg(long)]
        target: Option<NaiveDate>,
    },

    /// Re-download benchmark series, ignoring the cache age
    Refresh {
        /// Benchmarks to refresh (default: all)
        benchmarks: Vec<String>,
    },
}
