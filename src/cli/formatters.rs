//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of data calculation from presentation.

use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use crate::calculator::{ComparisonResult, FallbackLevel, InvestmentResult, Projection};
use crate::investments::InvestmentType;
use crate::rates::{RatePoint, SeriesKind};
use crate::utils::{format_currency, format_fraction_percent, format_percent};

fn signed_currency(value: Decimal) -> String {
    let text = format_currency(value);
    if value >= Decimal::ZERO {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

fn signed_percent(value: Decimal) -> String {
    let text = format_percent(value);
    if value >= Decimal::ZERO {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

/// Serialize any result for `--json`
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"detail": "JSON serialization failed: {}"}}"#, e))
}

/// Format a single calculation as a labelled summary
pub fn format_result(result: &InvestmentResult) -> String {
    let mut output = format!(
        "\n{} {} from {} to {} ({} days)\n\n",
        "📈".cyan().bold(),
        result.investment_type.name().bold(),
        result.start_date.format("%d/%m/%Y"),
        result.end_date.format("%d/%m/%Y"),
        result.elapsed_days
    );

    #[derive(Tabled)]
    struct Line {
        #[tabled(rename = "")]
        label: &'static str,
        #[tabled(rename = "")]
        value: String,
    }

    let tax = &result.tax_info;
    let mut lines = vec![
        Line {
            label: "Initial amount",
            value: format_currency(result.initial_amount),
        },
        Line {
            label: "Annual rate",
            value: format_percent(result.rate),
        },
        Line {
            label: "Gross profit",
            value: signed_currency(result.gross_profit),
        },
        Line {
            label: "Tax",
            value: format!(
                "{} ({})",
                format_currency(result.tax_amount),
                tax.tax_period_description
            ),
        },
    ];
    if tax.iof_amount > Decimal::ZERO {
        lines.push(Line {
            label: "  of which IOF",
            value: format_currency(tax.iof_amount),
        });
    }
    lines.extend([
        Line {
            label: "Net profit",
            value: signed_currency(result.net_profit),
        },
        Line {
            label: "Final amount",
            value: format_currency(result.final_amount).bold().to_string(),
        },
        Line {
            label: "Net return",
            value: signed_percent(result.net_return_percentage),
        },
        Line {
            label: "Effective rate (a.a.)",
            value: signed_percent(result.effective_rate),
        },
        Line {
            label: "FGC",
            value: result.fgc_coverage.description.clone(),
        },
    ]);

    let mut table = Table::new(&lines);
    table.with(Style::blank());
    output.push_str(&table.to_string());
    output.push('\n');

    if result.used_projection {
        output.push_str(&format!(
            "\n{} Period extends past published data; benchmark rates were projected\n",
            "ℹ".blue().bold()
        ));
    }
    output
}

/// Format a ranked comparison
pub fn format_comparison_table(results: &[ComparisonResult]) -> String {
    if results.is_empty() {
        return format!(
            "{} No investments to compare\nPass rates such as --cdb-rate or flags such as --include-selic\n",
            "ℹ".blue().bold()
        );
    }

    #[derive(Tabled)]
    struct ComparisonRow {
        #[tabled(rename = "#")]
        rank: usize,
        #[tabled(rename = "Investment")]
        label: String,
        #[tabled(rename = "Rate")]
        rate: String,
        #[tabled(rename = "Gross")]
        gross: String,
        #[tabled(rename = "Tax")]
        tax: String,
        #[tabled(rename = "Net")]
        net: String,
        #[tabled(rename = "Final")]
        final_amount: String,
        #[tabled(rename = "Eff. a.a.")]
        effective: String,
        #[tabled(rename = "FGC")]
        fgc: String,
        #[tabled(rename = "Recommendation")]
        recommendation: String,
    }

    let rows: Vec<ComparisonRow> = results
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let r = &entry.result;
            let label = if idx == 0 {
                entry.label.green().bold().to_string()
            } else {
                entry.label.clone()
            };
            let rate = if r.used_projection {
                format!("{}*", format_percent(r.rate))
            } else {
                format_percent(r.rate)
            };
            ComparisonRow {
                rank: idx + 1,
                label,
                rate,
                gross: format_currency(r.gross_profit),
                tax: format_currency(r.tax_amount),
                net: signed_currency(r.net_profit),
                final_amount: format_currency(r.final_amount),
                effective: signed_percent(r.effective_rate),
                fgc: format_percent(r.fgc_coverage.coverage_percentage),
                recommendation: entry.recommendation.clone(),
            }
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(2..9), Alignment::right());

    let mut output = table.to_string();
    if results.iter().any(|r| r.result.used_projection) {
        output.push_str(&format!(
            "\n{} * rate includes projected benchmark values\n",
            "ℹ".blue().bold()
        ));
    } else {
        output.push('\n');
    }
    output
}

#[derive(Serialize)]
pub struct InvestmentTypeInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub fn investment_type_catalog() -> Vec<InvestmentTypeInfo> {
    InvestmentType::ALL
        .iter()
        .map(|t| InvestmentTypeInfo {
            id: t.as_str(),
            name: t.name(),
            description: t.description(),
        })
        .collect()
}

pub fn format_investment_types_table(types: &[InvestmentTypeInfo]) -> String {
    #[derive(Tabled)]
    struct TypeRow {
        #[tabled(rename = "Id")]
        id: &'static str,
        #[tabled(rename = "Name")]
        name: &'static str,
        #[tabled(rename = "Description")]
        description: &'static str,
    }

    let rows: Vec<TypeRow> = types
        .iter()
        .map(|t| TypeRow {
            id: t.id,
            name: t.name,
            description: t.description,
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    format!("{}\n", table)
}

fn format_point_value(kind: SeriesKind, value: Decimal) -> String {
    match kind {
        SeriesKind::Rate => format_fraction_percent(value),
        SeriesKind::Price => format_currency(value),
    }
}

/// Format a series tail and its projection
pub fn format_rates_table(
    benchmark: &str,
    kind: SeriesKind,
    tail: &[RatePoint],
    projection: &Projection,
) -> String {
    let mut output = format!("\n{} {}\n\n", "📊".cyan().bold(), benchmark.to_uppercase().bold());

    #[derive(Tabled)]
    struct PointRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    let rows: Vec<PointRow> = tail
        .iter()
        .map(|p| PointRow {
            date: p.date.format("%d/%m/%Y").to_string(),
            value: format_point_value(kind, p.value),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());
    output.push_str(&table.to_string());
    output.push('\n');

    let source = match projection.fallback {
        FallbackLevel::Historical => "published value".to_string(),
        FallbackLevel::Nominal { lookback_days } => {
            format!("trend over {} days", lookback_days)
        }
        FallbackLevel::Widened { lookback_days } => {
            format!("trend over widened {} day window", lookback_days)
        }
        FallbackLevel::LastValue => "last value held flat".to_string(),
    };
    output.push_str(&format!(
        "\n{:<16} {} ({})\n",
        "Projection:".bold(),
        format_point_value(kind, projection.value),
        source
    ));
    output.push_str(&format!(
        "{:<16} {} as of {}\n",
        "Base:".bold(),
        format_point_value(kind, projection.base_value),
        projection.base_date.format("%d/%m/%Y")
    ));
    if projection.is_extrapolated() {
        output.push_str(&format!(
            "{:<16} trend {} / volatility {} over {} points\n",
            "Window:".bold(),
            projection.trend.round_dp(6),
            projection.volatility.round_dp(6),
            projection.window_points
        ));
    }
    output.push_str(&format!(
        "{:<16} {}\n",
        "Target:".bold(),
        projection.target_date.format("%d/%m/%Y")
    ));
    output
}
