//! Command dispatcher that resolves rate data and routes parsed CLI commands
//! to the calculation engine and the output formatters.

use anyhow::{Context as _, Result};
use chrono::{Duration, Local, NaiveDate};
use colored::Colorize;
use itertools::Itertools;
use rust_decimal::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::calculator::{self, project, CalculationRequest, CompareRequest, Projection};
use crate::cli::formatters;
use crate::cli::{Cli, Commands, RateArgs, RatesCommands};
use crate::config::Config;
use crate::error::CalculationError;
use crate::investments::{Investment, InvestmentType, RateParams};
use crate::rates::csv_file::load_rates_file;
use crate::rates::fetch::RateFetcher;
use crate::rates::{Benchmark, RatePoint, RateSeriesSet, RateSource};

/// Settings shared by every command
pub struct Context {
    pub json: bool,
    pub rates_file: Option<PathBuf>,
    pub offline: bool,
    pub config: Config,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Ok(Self {
            json: cli.json,
            rates_file: cli.rates_file.clone(),
            offline: cli.offline,
            config: Config::load()?,
        })
    }

    /// Series for `benchmarks` covering `start..end`
    async fn load_rates(
        &self,
        benchmarks: &[Benchmark],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RateSeriesSet> {
        if benchmarks.is_empty() {
            return Ok(RateSeriesSet::new());
        }
        if let Some(path) = &self.rates_file {
            info!("Loading rates from {}", path.display());
            return load_rates_file(path);
        }
        RateFetcher::new(self.config.provider.clone(), self.offline)
            .load(benchmarks, start, end)
            .await
    }
}

/// Benchmarks the given investments read, savings pulling in SELIC
pub fn required_benchmarks(investments: &[Investment]) -> Vec<Benchmark> {
    investments
        .iter()
        .filter_map(Investment::benchmark)
        .flat_map(|b| match b {
            Benchmark::Savings => vec![Benchmark::Savings, Benchmark::Selic],
            other => vec![other],
        })
        .sorted()
        .dedup()
        .collect()
}

/// Route a parsed command to its handler
pub async fn dispatch(cli: Cli) -> Result<()> {
    let ctx = Context::from_cli(&cli)?;
    match cli.command {
        Commands::Calculate {
            investment_type,
            amount,
            start_date,
            end_date,
            rates,
        } => dispatch_calculate(&ctx, &investment_type, amount, start_date, end_date, &rates).await,
        Commands::Compare {
            amount,
            start_date,
            end_date,
            period,
            rates,
            include_poupanca,
            include_selic,
            include_cdi,
            include_btc,
        } => {
            let (start_date, end_date) = match period {
                Some(years) => period_from_today(years)?,
                None => (start_date, end_date),
            };
            let request = CompareRequest {
                amount,
                start_date,
                end_date,
                params: RateParams::from(&rates),
                include_poupanca,
                include_selic,
                include_cdi,
                include_btc,
            };
            dispatch_compare(&ctx, &request).await
        }
        Commands::InvestmentTypes => dispatch_investment_types(&ctx),
        Commands::Rates { action } => match action {
            RatesCommands::Show {
                benchmark,
                tail,
                target,
            } => dispatch_rates_show(&ctx, &benchmark, tail, target).await,
            RatesCommands::Refresh { benchmarks } => dispatch_rates_refresh(&ctx, &benchmarks).await,
        },
    }
}

/// Start today, end `years` later (days truncated)
fn period_from_today(
    years: Decimal,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), CalculationError> {
    if years <= Decimal::ZERO {
        return Err(CalculationError::validation("period", "must be greater than zero"));
    }
    let days = years
        .checked_mul(Decimal::from(365))
        .and_then(|d| d.trunc().to_i64())
        .ok_or_else(|| CalculationError::validation("period", "is too large"))?;
    let today = Local::now().date_naive();
    let end = Duration::try_days(days)
        .and_then(|span| today.checked_add_signed(span))
        .ok_or_else(|| CalculationError::validation("period", "is too large"))?;
    Ok((Some(today), Some(end)))
}

async fn dispatch_calculate(
    ctx: &Context,
    investment_type: &str,
    amount: Decimal,
    start_date: NaiveDate,
    end_date: NaiveDate,
    rates: &RateArgs,
) -> Result<()> {
    let investment_type: InvestmentType = investment_type.parse()?;
    let investment = RateParams::from(rates).into_investment(investment_type)?;
    let request = CalculationRequest {
        investment,
        amount,
        start_date,
        end_date,
    };
    request.validate()?;

    let source = ctx
        .load_rates(&required_benchmarks(&[investment]), start_date, end_date)
        .await?;
    let result = calculator::calculate_investment(&request, &source, &ctx.config)?;

    if ctx.json {
        println!("{}", formatters::to_json(&result));
    } else {
        print!("{}", formatters::format_result(&result));
    }
    Ok(())
}

async fn dispatch_compare(ctx: &Context, request: &CompareRequest) -> Result<()> {
    let (start, end) = request.validate()?;
    let investments = request.investments()?;
    debug!("Comparing {} investments", investments.len());

    let source = ctx
        .load_rates(&required_benchmarks(&investments), start, end)
        .await?;
    let results = calculator::compare(request, &source, &ctx.config)?;

    if ctx.json {
        println!("{}", formatters::to_json(&results));
    } else {
        println!(
            "\n{} Comparing {} over {} to {}\n",
            "📊".cyan().bold(),
            crate::utils::format_currency(request.amount).bold(),
            start.format("%d/%m/%Y"),
            end.format("%d/%m/%Y")
        );
        print!("{}", formatters::format_comparison_table(&results));
    }
    Ok(())
}

fn dispatch_investment_types(ctx: &Context) -> Result<()> {
    let catalog = formatters::investment_type_catalog();
    if ctx.json {
        println!("{}", formatters::to_json(&catalog));
    } else {
        print!("{}", formatters::format_investment_types_table(&catalog));
    }
    Ok(())
}

#[derive(Serialize)]
struct RatesShowJson<'a> {
    benchmark: Benchmark,
    points: &'a [RatePoint],
    projection: &'a Projection,
}

async fn dispatch_rates_show(
    ctx: &Context,
    benchmark: &str,
    tail: usize,
    target: Option<NaiveDate>,
) -> Result<()> {
    let benchmark: Benchmark = benchmark.parse()?;
    let today = Local::now().date_naive();
    let target = target.unwrap_or(today + Duration::days(365));

    let source = ctx.load_rates(&[benchmark], today, today).await?;
    let series = source
        .series(benchmark)
        .ok_or(CalculationError::BenchmarkUnavailable { benchmark })?;

    let points = series.points();
    let tail_points = &points[points.len().saturating_sub(tail)..];
    let projection = project(series, target, &ctx.config.projection)
        .with_context(|| format!("Failed to project {}", benchmark))?;

    if ctx.json {
        println!(
            "{}",
            formatters::to_json(&RatesShowJson {
                benchmark,
                points: tail_points,
                projection: &projection,
            })
        );
    } else {
        print!(
            "{}",
            formatters::format_rates_table(
                benchmark.as_str(),
                benchmark.kind(),
                tail_points,
                &projection
            )
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct RefreshedJson {
    benchmark: Benchmark,
    points: usize,
    last_date: Option<NaiveDate>,
}

async fn dispatch_rates_refresh(ctx: &Context, benchmarks: &[String]) -> Result<()> {
    if ctx.rates_file.is_some() {
        anyhow::bail!("Cannot refresh rates while reading them from --rates-file");
    }
    let benchmarks: Vec<Benchmark> = if benchmarks.is_empty() {
        Benchmark::ALL.to_vec()
    } else {
        benchmarks
            .iter()
            .map(|b| b.parse::<Benchmark>())
            .collect::<Result<_, _>>()?
    };

    let fetcher = RateFetcher::new(ctx.config.provider.clone(), ctx.offline);
    let refreshed = fetcher.refresh(&benchmarks).await?;

    let summary: Vec<RefreshedJson> = refreshed
        .benchmarks()
        .into_iter()
        .filter_map(|b| refreshed.series(b))
        .map(|s| RefreshedJson {
            benchmark: s.benchmark(),
            points: s.len(),
            last_date: s.last().map(|p| p.date),
        })
        .collect();

    if ctx.json {
        println!("{}", formatters::to_json(&summary));
    } else {
        for entry in &summary {
            println!(
                "{} {}: {} points{}",
                "✓".green().bold(),
                entry.benchmark,
                entry.points,
                entry
                    .last_date
                    .map(|d| format!(", last {}", d.format("%d/%m/%Y")))
                    .unwrap_or_default()
            );
        }
        let missing = benchmarks.len() - summary.len();
        if missing > 0 {
            println!(
                "{} {} benchmark(s) could not be refreshed (see log)",
                "⚠".yellow().bold(),
                missing
            );
        }
    }
    Ok(())
}
