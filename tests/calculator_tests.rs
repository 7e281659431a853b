use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use nestegg::calculator::{calculate_investment, CalculationRequest, InvestmentResult};
use nestegg::config::Config;
use nestegg::investments::{Indexation, Investment};
use nestegg::rates::{Benchmark, RatePoint, RateSeries, RateSeriesSet};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Weekly observations from `from` to `to`, moving linearly by `step` each week
fn weekly(benchmark: Benchmark, from: NaiveDate, to: NaiveDate, start: Decimal, step: Decimal) -> RateSeries {
    let mut points = Vec::new();
    let mut date = from;
    let mut value = start;
    while date <= to {
        points.push(RatePoint::new(date, value));
        date += Duration::days(7);
        value += step;
    }
    RateSeries::new(benchmark, points).unwrap()
}

fn fixtures() -> RateSeriesSet {
    RateSeriesSet::new()
        .with(weekly(Benchmark::Cdi, d(2023, 1, 2), d(2024, 12, 30), dec!(0.1165), Decimal::ZERO))
        .with(weekly(Benchmark::Selic, d(2023, 1, 2), d(2024, 12, 30), dec!(0.1175), Decimal::ZERO))
        .with(weekly(
            Benchmark::Ipca,
            d(2023, 1, 2),
            d(2024, 12, 30),
            dec!(0.04),
            dec!(0.0001),
        ))
}

fn run(investment: Investment, amount: Decimal, start: NaiveDate, end: NaiveDate) -> InvestmentResult {
    let request = CalculationRequest {
        investment,
        amount,
        start_date: start,
        end_date: end,
    };
    calculate_investment(&request, &fixtures(), &Config::default()).unwrap()
}

fn fixed_cdb(rate: Decimal) -> Investment {
    Investment::Cdb(Indexation::Fixed { rate })
}

#[test]
fn test_regressive_brackets_at_boundaries() {
    let start = d(2023, 1, 1);
    let cases = [
        (180, dec!(22.5)),
        (181, dec!(20)),
        (360, dec!(20)),
        (361, dec!(17.5)),
        (720, dec!(17.5)),
        (721, dec!(15)),
    ];
    for (days, expected) in cases {
        let result = run(fixed_cdb(dec!(12)), dec!(10000), start, start + Duration::days(days));
        assert_eq!(
            result.tax_info.tax_rate_percentage, expected,
            "bracket for {} days",
            days
        );
        assert_eq!(result.tax_info.tax_period_days, days);
    }
}

#[test]
fn test_tax_free_variants_pay_no_tax() {
    let start = d(2023, 3, 1);
    let end = d(2023, 9, 1);
    let variants = [
        Investment::Lci(Indexation::Fixed { rate: dec!(11) }),
        Investment::Lca(Indexation::CdiPercentage {
            percentage: dec!(95),
        }),
        Investment::Lci(Indexation::IpcaSpread { spread: dec!(5) }),
        Investment::Savings,
    ];
    for investment in variants {
        let result = run(investment, dec!(20000), start, end);
        assert_eq!(result.tax_amount, Decimal::ZERO, "{:?}", investment);
        assert!(result.tax_info.is_tax_free);
        assert_eq!(result.tax_info.tax_period_description, "Tax exempt");
        assert_eq!(result.net_profit, result.gross_profit);
    }
}

#[test]
fn test_short_redemption_pays_iof_first() {
    let start = d(2023, 5, 1);
    let result = run(fixed_cdb(dec!(13)), dec!(50000), start, start + Duration::days(10));
    assert!(result.tax_info.iof_amount > Decimal::ZERO);
    assert!(result.tax_amount > result.tax_info.iof_amount);
    assert_eq!(result.tax_info.tax_rate_percentage, dec!(22.5));
}

#[test]
fn test_gross_profit_grows_with_elapsed_days() {
    let start = d(2023, 1, 1);
    let mut previous = Decimal::ZERO;
    for days in [30, 90, 180, 365, 730] {
        let result = run(
            Investment::TreasurySelic { spread: dec!(0.1) },
            dec!(10000),
            start,
            start + Duration::days(days),
        );
        assert!(result.gross_profit > previous);
        previous = result.gross_profit;
    }
}

#[test]
fn test_fgc_ceiling_splits_large_deposits() {
    let result = run(fixed_cdb(dec!(10)), dec!(300000), d(2023, 1, 1), d(2024, 1, 1));
    assert_eq!(result.gross_profit, dec!(30000.00));
    assert_eq!(result.final_amount, dec!(324750.00));

    let fgc = &result.fgc_coverage;
    assert!(fgc.is_covered);
    assert_eq!(fgc.covered_amount, dec!(250000));
    assert_eq!(fgc.uncovered_amount, dec!(74750.00));
    assert_eq!(fgc.coverage_percentage, dec!(76.98));
}

#[test]
fn test_treasury_is_government_backed() {
    let result = run(
        Investment::TreasuryIpca { spread: dec!(6) },
        dec!(1000),
        d(2023, 1, 1),
        d(2024, 1, 1),
    );
    assert!(!result.fgc_coverage.is_covered);
    assert_eq!(result.fgc_coverage.uncovered_amount, result.final_amount);
    assert!(result
        .fgc_coverage
        .description
        .contains("government-guaranteed"));
}

#[test]
fn test_projection_past_history_is_deterministic() {
    let investment = Investment::Cdb(Indexation::IpcaSpread { spread: dec!(6) });
    let first = run(investment, dec!(10000), d(2024, 6, 1), d(2026, 6, 1));
    let second = run(investment, dec!(10000), d(2024, 6, 1), d(2026, 6, 1));
    assert!(first.used_projection);
    assert_eq!(first, second);

    let historical = run(investment, dec!(10000), d(2023, 6, 1), d(2024, 6, 1));
    assert!(!historical.used_projection);
}

#[test]
fn test_cdi_percentage_scales_benchmark() {
    let full = run(
        Investment::CdiNote {
            percentage: dec!(100),
        },
        dec!(10000),
        d(2023, 1, 1),
        d(2024, 1, 1),
    );
    let boosted = run(
        Investment::CdiNote {
            percentage: dec!(120),
        },
        dec!(10000),
        d(2023, 1, 1),
        d(2024, 1, 1),
    );
    assert_eq!(full.rate, dec!(11.65));
    assert_eq!(boosted.rate, dec!(13.98));
    assert_eq!(full.gross_profit, dec!(1165.00));
    assert!(!full.fgc_coverage.is_covered);
}
