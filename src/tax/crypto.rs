use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Monthly sales at or below this amount are exempt from capital-gains tax
pub const MONTHLY_SALES_EXEMPTION: Decimal = dec!(35000);

/// Capital-gains rate for a crypto sale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CryptoTaxRule {
    /// Fraction, 0.15 for 15%
    pub rate: Decimal,
    pub description: &'static str,
    pub exempt: bool,
}

const GAIN_BRACKETS: [(Decimal, Decimal, &str); 3] = [
    (dec!(5000000), dec!(0.15), "Gains up to R$ 5M (15% tax)"),
    (dec!(10000000), dec!(0.175), "Gains from R$ 5M to R$ 10M (17.5% tax)"),
    (dec!(30000000), dec!(0.20), "Gains from R$ 10M to R$ 30M (20% tax)"),
];

const TOP_BRACKET: (Decimal, &str) = (dec!(0.225), "Gains above R$ 30M (22.5% tax)");

/// Rule for selling `initial + gross_profit` worth of crypto bought for `initial`
pub fn crypto_tax_rule(initial_amount: Decimal, gross_profit: Decimal) -> CryptoTaxRule {
    if gross_profit <= Decimal::ZERO {
        return CryptoTaxRule {
            rate: Decimal::ZERO,
            description: "No gain (no tax due)",
            exempt: true,
        };
    }

    let sale_amount = initial_amount + gross_profit;
    if sale_amount <= MONTHLY_SALES_EXEMPTION {
        return CryptoTaxRule {
            rate: Decimal::ZERO,
            description: "Sales up to R$ 35,000 (tax exempt)",
            exempt: true,
        };
    }

    let (rate, description) = GAIN_BRACKETS
        .iter()
        .find(|(ceiling, _, _)| gross_profit <= *ceiling)
        .map(|(_, rate, description)| (*rate, *description))
        .unwrap_or(TOP_BRACKET);

    CryptoTaxRule {
        rate,
        description,
        exempt: false,
    }
}
