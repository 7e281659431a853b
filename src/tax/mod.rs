// Tax module - regressive income tax, IOF and crypto capital gains

pub mod crypto;
pub mod regressive;

pub use crypto::{crypto_tax_rule, CryptoTaxRule};
pub use regressive::{bracket_for_days, iof_rate, resolve_tax, TaxBracket, REGRESSIVE_BRACKETS, TAX_EXEMPT};

use rust_decimal::Decimal;

use crate::investments::Investment;
use crate::utils::round_money;

/// IOF only applies to short redemptions of taxable fixed income
pub const IOF_MAX_DAYS: i64 = 30;

/// Taxes owed on one redemption
#[derive(Debug, Clone, PartialEq)]
pub struct TaxAssessment {
    /// Income or capital-gains rate as a fraction
    pub rate: Decimal,
    pub description: String,
    pub is_tax_free: bool,
    pub iof_amount: Decimal,
    pub income_tax: Decimal,
}

impl TaxAssessment {
    pub fn total(&self) -> Decimal {
        self.iof_amount + self.income_tax
    }
}

/// Assess the taxes on `gross_profit` earned over `elapsed_days`
///
/// Fixed income follows the regressive table, with IOF deducted first for
/// redemptions within 30 days. Crypto follows the capital-gains rules.
/// Losses are never taxed.
pub fn assess(
    investment: &Investment,
    elapsed_days: i64,
    initial_amount: Decimal,
    gross_profit: Decimal,
) -> TaxAssessment {
    if investment.is_crypto() {
        let rule = crypto_tax_rule(initial_amount, gross_profit);
        let income_tax = if rule.exempt {
            Decimal::ZERO
        } else {
            round_money(gross_profit * rule.rate)
        };
        return TaxAssessment {
            rate: rule.rate,
            description: rule.description.to_string(),
            is_tax_free: false,
            iof_amount: Decimal::ZERO,
            income_tax,
        };
    }

    let bracket = resolve_tax(elapsed_days, investment);
    let is_tax_free = investment.is_tax_free();
    if is_tax_free || gross_profit <= Decimal::ZERO {
        return TaxAssessment {
            rate: bracket.rate,
            description: bracket.description.to_string(),
            is_tax_free,
            iof_amount: Decimal::ZERO,
            income_tax: Decimal::ZERO,
        };
    }

    // IOF follows the regressive daily table of Decree 6.306/2007 (96% on day
    // 1 down to zero on day 30); income tax is charged on what remains
    let iof_amount = if elapsed_days < IOF_MAX_DAYS {
        round_money(gross_profit * iof_rate(elapsed_days))
    } else {
        Decimal::ZERO
    };
    let income_tax = round_money((gross_profit - iof_amount) * bracket.rate);

    TaxAssessment {
        rate: bracket.rate,
        description: bracket.description.to_string(),
        is_tax_free: false,
        iof_amount,
        income_tax,
    }
}
