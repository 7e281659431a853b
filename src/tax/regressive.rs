use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::investments::Investment;

/// A holding-period tax bracket; day bounds are inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaxBracket {
    pub min_days: i64,
    /// `None` for the open-ended last bracket
    pub max_days: Option<i64>,
    /// Fraction, 0.225 for 22.5%
    pub rate: Decimal,
    pub description: &'static str,
}

impl TaxBracket {
    pub fn contains(&self, days: i64) -> bool {
        days >= self.min_days && self.max_days.is_none_or(|max| days <= max)
    }

    pub fn rate_percentage(&self) -> Decimal {
        self.rate * Decimal::ONE_HUNDRED
    }
}

/// Income-tax table for fixed income, ordered and contiguous from day 0
pub const REGRESSIVE_BRACKETS: [TaxBracket; 4] = [
    TaxBracket {
        min_days: 0,
        max_days: Some(180),
        rate: dec!(0.225),
        description: "Up to 180 days (22.5% tax)",
    },
    TaxBracket {
        min_days: 181,
        max_days: Some(360),
        rate: dec!(0.20),
        description: "181 to 360 days (20% tax)",
    },
    TaxBracket {
        min_days: 361,
        max_days: Some(720),
        rate: dec!(0.175),
        description: "361 to 720 days (17.5% tax)",
    },
    TaxBracket {
        min_days: 721,
        max_days: None,
        rate: dec!(0.15),
        description: "More than 720 days (15% tax)",
    },
];

pub const TAX_EXEMPT: TaxBracket = TaxBracket {
    min_days: 0,
    max_days: None,
    rate: Decimal::ZERO,
    description: "Tax exempt",
};

/// IOF share of the yield for redemptions on day 1..=30 (percent)
const IOF_TABLE: [u32; 30] = [
    96, 93, 90, 86, 83, 80, 76, 73, 70, 66, 63, 60, 56, 53, 50, 46, 43, 40, 36, 33, 30, 26, 23, 20,
    16, 13, 10, 6, 3, 0,
];

pub fn bracket_for_days(elapsed_days: i64) -> &'static TaxBracket {
    REGRESSIVE_BRACKETS
        .iter()
        .find(|b| b.contains(elapsed_days))
        .unwrap_or(&REGRESSIVE_BRACKETS[0])
}

/// Bracket that applies to a variant held for `elapsed_days`
pub fn resolve_tax(elapsed_days: i64, investment: &Investment) -> TaxBracket {
    if investment.is_tax_free() {
        TAX_EXEMPT
    } else {
        *bracket_for_days(elapsed_days)
    }
}

/// IOF rate as a fraction; zero from day 30 on
pub fn iof_rate(elapsed_days: i64) -> Decimal {
    if elapsed_days < 1 {
        return Decimal::from(IOF_TABLE[0]) / Decimal::ONE_HUNDRED;
    }
    usize::try_from(elapsed_days - 1)
        .ok()
        .and_then(|idx| IOF_TABLE.get(idx))
        .map(|pct| Decimal::from(*pct) / Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
}
