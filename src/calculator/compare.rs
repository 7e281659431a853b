use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{info, warn};

use super::{calculate_investment, elapsed_days, validate_amount, CalculationRequest, InvestmentResult};
use crate::config::Config;
use crate::error::CalculationError;
use crate::investments::{Indexation, Investment, RateParams};
use crate::rates::RateSource;
use crate::utils::round_percent;

pub const BEST_OPTION: &str = "Best option among compared investments";
const TAX_FREE_PREFIX: &str = "Tax-free option, ";

/// A comparison across variants for one principal and period
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompareRequest {
    pub amount: Decimal,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub params: RateParams,
    pub include_poupanca: bool,
    pub include_selic: bool,
    pub include_cdi: bool,
    pub include_btc: bool,
}

impl CompareRequest {
    /// Variants selected by the parameters present and the include flags
    pub fn investments(&self) -> Result<Vec<Investment>, CalculationError> {
        self.params.validate()?;
        let p = &self.params;

        let candidates = [
            p.cdb_rate.map(|rate| Investment::Cdb(Indexation::Fixed { rate })),
            p.lci_rate.map(|rate| Investment::Lci(Indexation::Fixed { rate })),
            p.lca_rate.map(|rate| Investment::Lca(Indexation::Fixed { rate })),
            p.ipca_spread.map(|spread| Investment::TreasuryIpca { spread }),
            p.selic_spread.map(|spread| Investment::TreasurySelic { spread }),
            p.cdi_percentage.map(|percentage| Investment::CdiNote { percentage }),
            self.include_poupanca.then_some(Investment::Savings),
            self.include_selic.then_some(Investment::TreasurySelic {
                spread: Decimal::ZERO,
            }),
            self.include_cdi.then_some(Investment::Cdb(Indexation::CdiPercentage {
                percentage: dec!(100),
            })),
            self.include_btc.then_some(Investment::Bitcoin),
        ];

        let mut investments: Vec<Investment> = Vec::new();
        for investment in candidates.into_iter().flatten() {
            if !investments.contains(&investment) {
                investments.push(investment);
            }
        }
        Ok(investments)
    }

    /// Start and end dates; a request must carry both
    pub fn period(&self) -> Result<(NaiveDate, NaiveDate), CalculationError> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Ok((start, end)),
            (None, _) => Err(CalculationError::validation("start_date", "is required")),
            (_, None) => Err(CalculationError::validation("end_date", "is required")),
        }
    }

    /// Check the amount and period, returning the dates
    pub fn validate(&self) -> Result<(NaiveDate, NaiveDate), CalculationError> {
        validate_amount(self.amount)?;
        let (start, end) = self.period()?;
        elapsed_days(start, end)?;
        Ok((start, end))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    #[serde(flatten)]
    pub result: InvestmentResult,
    /// Display label of the variant
    #[serde(rename = "type")]
    pub label: String,
    pub tax_free: bool,
    pub recommendation: String,
}

fn ranking(a: &ComparisonResult, b: &ComparisonResult) -> Ordering {
    b.result
        .net_profit
        .cmp(&a.result.net_profit)
        .then_with(|| a.result.tax_amount.cmp(&b.result.tax_amount))
        .then_with(|| {
            a.result
                .investment_type
                .catalog_index()
                .cmp(&b.result.investment_type.catalog_index())
        })
}

fn recommendation(entry: &ComparisonResult, top: &ComparisonResult, principal: Decimal) -> String {
    let deficit = round_percent(
        (top.result.net_profit - entry.result.net_profit) / principal * Decimal::ONE_HUNDRED,
    );
    let prefix = if entry.tax_free { TAX_FREE_PREFIX } else { "" };
    format!("{}{:.2}% lower than {}", prefix, deficit, top.label)
}

/// Calculate, rank and annotate every variant
///
/// A variant that fails is dropped with a warning; only a malformed
/// request (amount or period) fails the whole comparison.
pub fn compare(
    request: &CompareRequest,
    rates: &dyn RateSource,
    config: &Config,
) -> Result<Vec<ComparisonResult>, CalculationError> {
    let (start, end) = request.validate()?;
    let investments = request.investments()?;

    let mut entries: Vec<ComparisonResult> = investments
        .iter()
        .filter_map(|investment| {
            let calc = CalculationRequest {
                investment: *investment,
                amount: request.amount,
                start_date: start,
                end_date: end,
            };
            match calculate_investment(&calc, rates, config) {
                Ok(result) => Some(ComparisonResult {
                    label: investment.display_label(),
                    tax_free: result.tax_info.is_tax_free,
                    recommendation: String::new(),
                    result,
                }),
                Err(e) => {
                    warn!("Skipping {} in comparison: {}", investment.display_label(), e);
                    None
                }
            }
        })
        .collect();

    entries.sort_by(ranking);

    if let Some(top) = entries.first().cloned() {
        for (idx, entry) in entries.iter_mut().enumerate() {
            entry.recommendation = if idx == 0 {
                BEST_OPTION.to_string()
            } else {
                recommendation(entry, &top, request.amount)
            };
        }
    }

    info!(
        "Compared {} of {} requested investments",
        entries.len(),
        investments.len()
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::RateSeriesSet;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn base_request() -> CompareRequest {
        CompareRequest {
            amount: dec!(10000),
            start_date: Some(d(2023, 1, 1)),
            end_date: Some(d(2024, 1, 1)),
            ..Default::default()
        }
    }

    #[test]
    fn test_parameters_select_variants() {
        let request = CompareRequest {
            params: RateParams {
                cdb_rate: Some(dec!(13)),
                selic_spread: Some(dec!(0)),
                ..Default::default()
            },
            include_selic: true,
            include_btc: true,
            ..base_request()
        };
        let investments = request.investments().unwrap();
        // the explicit zero spread and the SELIC flag name the same bond
        assert_eq!(
            investments,
            vec![
                Investment::Cdb(Indexation::Fixed { rate: dec!(13) }),
                Investment::TreasurySelic {
                    spread: Decimal::ZERO
                },
                Investment::Bitcoin,
            ]
        );
    }

    #[test]
    fn test_empty_request_yields_empty_result() {
        let results = compare(&base_request(), &RateSeriesSet::new(), &Config::default()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_ranking_and_recommendations() {
        let request = CompareRequest {
            params: RateParams {
                cdb_rate: Some(dec!(14.5)),
                lci_rate: Some(dec!(11)),
                lca_rate: Some(dec!(12)),
                ..Default::default()
            },
            ..base_request()
        };
        let results = compare(&request, &RateSeriesSet::new(), &Config::default()).unwrap();
        let labels: Vec<&str> = results.iter().map(|r| r.label.as_str()).collect();
        // CDB nets 1196.25, LCA 1200.00, LCI 1100.00
        assert_eq!(labels, vec!["LCA", "CDB", "LCI"]);
        assert_eq!(results[0].recommendation, BEST_OPTION);
        assert_eq!(results[1].recommendation, "0.04% lower than LCA");
        assert_eq!(results[2].recommendation, "Tax-free option, 1.00% lower than LCA");
    }

    #[test]
    fn test_failed_variants_are_dropped() {
        let request = CompareRequest {
            params: RateParams {
                cdb_rate: Some(dec!(12)),
                ..Default::default()
            },
            include_cdi: true,
            include_poupanca: true,
            ..base_request()
        };
        // no benchmark data: only the fixed CDB survives
        let results = compare(&request, &RateSeriesSet::new(), &Config::default()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].label, "CDB");
    }

    #[test]
    fn test_malformed_request_fails() {
        let request = CompareRequest {
            amount: dec!(-1),
            ..base_request()
        };
        assert!(compare(&request, &RateSeriesSet::new(), &Config::default()).is_err());

        let request = CompareRequest {
            end_date: None,
            ..base_request()
        };
        assert!(compare(&request, &RateSeriesSet::new(), &Config::default()).is_err());
    }

    #[test]
    fn test_ties_fall_back_to_tax_then_catalog_order() {
        let request = CompareRequest {
            params: RateParams {
                lci_rate: Some(dec!(12)),
                lca_rate: Some(dec!(12)),
                ..Default::default()
            },
            ..base_request()
        };
        let results = compare(&request, &RateSeriesSet::new(), &Config::default()).unwrap();
        assert_eq!(results[0].label, "LCI");
        assert_eq!(results[1].label, "LCA");
        assert_eq!(results[1].recommendation, "Tax-free option, 0.00% lower than LCI");
    }

    #[test]
    fn test_flattened_json_shape() {
        let request = CompareRequest {
            params: RateParams {
                cdb_rate: Some(dec!(10)),
                ..Default::default()
            },
            ..base_request()
        };
        let results = compare(&request, &RateSeriesSet::new(), &Config::default()).unwrap();
        let json = serde_json::to_value(&results[0]).unwrap();
        assert_eq!(json["type"], "CDB");
        assert_eq!(json["investment_type"], "cdb");
        assert_eq!(json["tax_free"], false);
        assert!(json["net_profit"].is_number());
        assert!(json["tax_info"].is_object());
    }
}
