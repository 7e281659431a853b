//! Deposit guarantee (FGC) coverage
//!
//! The Fundo Garantidor de Créditos insures bank-issued instruments up to a
//! per-institution ceiling. Treasury bonds carry sovereign credit instead and
//! CDI notes and crypto have no guarantee at all.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::FgcSettings;
use crate::investments::Investment;
use crate::utils::{format_currency, round_money, round_percent};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FgcCoverage {
    pub is_covered: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub covered_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub uncovered_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub coverage_percentage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub limit_per_institution: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_coverage_limit: Decimal,
    pub description: String,
}

/// Coverage of `final_amount` held in a single institution
pub fn coverage(investment: &Investment, final_amount: Decimal, limits: &FgcSettings) -> FgcCoverage {
    let limit = limits.limit_per_institution;
    let total = limits.total_limit;

    if !investment.is_fgc_eligible() {
        let description = if investment.is_government_backed() {
            "Not covered by FGC: government-guaranteed (National Treasury)".to_string()
        } else {
            "Not covered by FGC".to_string()
        };
        return FgcCoverage {
            is_covered: false,
            covered_amount: Decimal::ZERO,
            uncovered_amount: round_money(final_amount.max(Decimal::ZERO)),
            coverage_percentage: Decimal::ZERO,
            limit_per_institution: limit,
            total_coverage_limit: total,
            description,
        };
    }

    let covered = final_amount.clamp(Decimal::ZERO, limit);
    let uncovered = (final_amount - limit).max(Decimal::ZERO);
    let percentage = if final_amount > Decimal::ZERO {
        round_percent(covered / final_amount * Decimal::ONE_HUNDRED)
    } else {
        Decimal::ZERO
    };

    let description = if uncovered.is_zero() {
        format!(
            "Fully covered by FGC (up to {} per institution)",
            format_currency(limit)
        )
    } else {
        format!(
            "Partially covered by FGC: {} above the {} per-institution limit",
            format_currency(uncovered),
            format_currency(limit)
        )
    };

    FgcCoverage {
        is_covered: true,
        covered_amount: round_money(covered),
        uncovered_amount: round_money(uncovered),
        coverage_percentage: percentage,
        limit_per_institution: limit,
        total_coverage_limit: total,
        description,
    }
}
