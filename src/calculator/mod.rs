//! Return calculation engine
//!
//! Pure and synchronous: every function here reads an injected
//! [`RateSource`] and never touches the network or disk.

pub mod compare;
pub mod composer;
pub mod compounding;
pub mod projector;

pub use compare::{compare, CompareRequest, ComparisonResult, BEST_OPTION};
pub use composer::{resolve_nominal_rate, savings_yield_from_selic, NominalRate};
pub use compounding::{annualize, annualize_capped, compound, elapsed_days, period_rate};
pub use projector::{project, FallbackLevel, Projection};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::CalculationError;
use crate::fgc::{self, FgcCoverage};
use crate::investments::{Investment, InvestmentType};
use crate::rates::RateSource;
use crate::tax;
use crate::utils::{round_money, round_rate};

/// One investment over one period
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationRequest {
    pub investment: Investment,
    pub amount: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl CalculationRequest {
    /// Check the amount and period, returning the elapsed days
    pub fn validate(&self) -> Result<i64, CalculationError> {
        validate_amount(self.amount)?;
        elapsed_days(self.start_date, self.end_date)
    }
}

pub(crate) fn validate_amount(amount: Decimal) -> Result<(), CalculationError> {
    if amount <= Decimal::ZERO {
        return Err(CalculationError::validation(
            "amount",
            "must be greater than zero",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxInfo {
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_rate_percentage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_amount: Decimal,
    pub is_tax_free: bool,
    pub tax_period_days: i64,
    pub tax_period_description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub iof_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentResult {
    pub investment_type: InvestmentType,
    #[serde(with = "rust_decimal::serde::float")]
    pub initial_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub final_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gross_profit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_profit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_amount: Decimal,
    /// Annualized net return, percent
    #[serde(with = "rust_decimal::serde::float")]
    pub effective_rate: Decimal,
    /// Net return over the whole period, percent
    #[serde(with = "rust_decimal::serde::float")]
    pub net_return_percentage: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub elapsed_days: i64,
    /// Nominal annual rate used, percent
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
    pub tax_info: TaxInfo,
    pub fgc_coverage: FgcCoverage,
    pub used_projection: bool,
}

/// Run one investment through rate resolution, compounding, tax and FGC
pub fn calculate_investment(
    request: &CalculationRequest,
    rates: &dyn RateSource,
    config: &Config,
) -> Result<InvestmentResult, CalculationError> {
    let days = request.validate()?;
    let investment = &request.investment;
    let amount = request.amount;

    let nominal = resolve_nominal_rate(
        investment,
        request.start_date,
        request.end_date,
        rates,
        &config.projection,
    )?;
    let period = match nominal.period_return {
        Some(period) => period,
        None => compound(nominal.annual_rate, request.start_date, request.end_date)?.0,
    };

    let gross_profit = round_money(
        amount
            .checked_mul(period)
            .ok_or_else(|| CalculationError::validation("amount", "profit overflows"))?,
    );
    let taxes = tax::assess(investment, days, amount, gross_profit);
    let tax_amount = round_money(taxes.total());
    let net_profit = gross_profit - tax_amount;
    let final_amount = amount + net_profit;

    let net_period_rate = net_profit / amount;
    let effective_rate = annualize_capped(net_period_rate, days) * Decimal::ONE_HUNDRED;

    debug!(
        "{}: rate {} over {} days, gross {}, tax {}, net {}",
        investment.investment_type(),
        nominal.annual_rate,
        days,
        gross_profit,
        tax_amount,
        net_profit
    );

    Ok(InvestmentResult {
        investment_type: investment.investment_type(),
        initial_amount: amount,
        final_amount,
        gross_profit,
        net_profit,
        tax_amount,
        effective_rate: round_rate(effective_rate),
        net_return_percentage: round_rate(net_period_rate * Decimal::ONE_HUNDRED),
        start_date: request.start_date,
        end_date: request.end_date,
        elapsed_days: days,
        rate: round_rate(nominal.annual_rate * Decimal::ONE_HUNDRED),
        tax_info: TaxInfo {
            tax_rate_percentage: round_rate(taxes.rate * Decimal::ONE_HUNDRED),
            tax_amount,
            is_tax_free: taxes.is_tax_free,
            tax_period_days: days,
            tax_period_description: taxes.description,
            iof_amount: taxes.iof_amount,
        },
        fgc_coverage: fgc::coverage(investment, final_amount, &config.fgc),
        used_projection: nominal.used_projection,
    })
}
