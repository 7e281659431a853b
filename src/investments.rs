//! Investment catalog
//!
//! The closed set of instruments the engine knows how to price. Each
//! `Investment` case carries the parameters it needs, so a request that
//! lacks a spread or percentage never reaches the calculator.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CalculationError;
use crate::rates::Benchmark;

/// Catalog identifiers, in stable catalog order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentType {
    Cdb,
    CdbCdi,
    CdbIpca,
    Lci,
    Lca,
    LciCdi,
    LcaCdi,
    LciIpca,
    LcaIpca,
    Selic,
    Ipca,
    Cdi,
    Poupanca,
    Btc,
}

impl InvestmentType {
    pub const ALL: [InvestmentType; 14] = [
        InvestmentType::Cdb,
        InvestmentType::CdbCdi,
        InvestmentType::CdbIpca,
        InvestmentType::Lci,
        InvestmentType::Lca,
        InvestmentType::LciCdi,
        InvestmentType::LcaCdi,
        InvestmentType::LciIpca,
        InvestmentType::LcaIpca,
        InvestmentType::Selic,
        InvestmentType::Ipca,
        InvestmentType::Cdi,
        InvestmentType::Poupanca,
        InvestmentType::Btc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentType::Cdb => "cdb",
            InvestmentType::CdbCdi => "cdb_cdi",
            InvestmentType::CdbIpca => "cdb_ipca",
            InvestmentType::Lci => "lci",
            InvestmentType::Lca => "lca",
            InvestmentType::LciCdi => "lci_cdi",
            InvestmentType::LcaCdi => "lca_cdi",
            InvestmentType::LciIpca => "lci_ipca",
            InvestmentType::LcaIpca => "lca_ipca",
            InvestmentType::Selic => "selic",
            InvestmentType::Ipca => "ipca",
            InvestmentType::Cdi => "cdi",
            InvestmentType::Poupanca => "poupanca",
            InvestmentType::Btc => "btc",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InvestmentType::Cdb => "CDB",
            InvestmentType::CdbCdi => "CDB (CDI)",
            InvestmentType::CdbIpca => "CDB (IPCA+)",
            InvestmentType::Lci => "LCI",
            InvestmentType::Lca => "LCA",
            InvestmentType::LciCdi => "LCI (CDI)",
            InvestmentType::LcaCdi => "LCA (CDI)",
            InvestmentType::LciIpca => "LCI (IPCA+)",
            InvestmentType::LcaIpca => "LCA (IPCA+)",
            InvestmentType::Selic => "Tesouro SELIC",
            InvestmentType::Ipca => "Tesouro IPCA+",
            InvestmentType::Cdi => "CDI",
            InvestmentType::Poupanca => "Poupança",
            InvestmentType::Btc => "Bitcoin",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            InvestmentType::Cdb => {
                "CDB (Certificado de Depósito Bancário) - Bank deposit certificate with fixed rate"
            }
            InvestmentType::CdbCdi => "CDB paying a percentage of the CDI rate",
            InvestmentType::CdbIpca => "CDB paying IPCA inflation plus a fixed spread",
            InvestmentType::Lci => {
                "LCI (Letra de Crédito Imobiliário) - Real estate credit note with fixed rate, tax-free"
            }
            InvestmentType::Lca => {
                "LCA (Letra de Crédito do Agronegócio) - Agribusiness credit note with fixed rate, tax-free"
            }
            InvestmentType::LciCdi => "LCI paying a percentage of the CDI rate, tax-free",
            InvestmentType::LcaCdi => "LCA paying a percentage of the CDI rate, tax-free",
            InvestmentType::LciIpca => "LCI paying IPCA inflation plus a fixed spread, tax-free",
            InvestmentType::LcaIpca => "LCA paying IPCA inflation plus a fixed spread, tax-free",
            InvestmentType::Selic => {
                "SELIC Treasury Bonds - Government bonds yielding the SELIC rate plus an optional spread"
            }
            InvestmentType::Ipca => "IPCA - Treasury bond indexed to Brazilian inflation plus a spread",
            InvestmentType::Cdi => {
                "CDI (Certificado de Depósito Interbancário) - Note paying a percentage of the interbank rate"
            }
            InvestmentType::Poupanca => {
                "Poupança - Tax-free savings account with yield based on SELIC rate"
            }
            InvestmentType::Btc => "Bitcoin - Cryptocurrency priced in BRL, subject to capital gains rules",
        }
    }

    /// Position in the catalog, used as the final ranking tie-break
    pub fn catalog_index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|t| t == self)
            .unwrap_or(Self::ALL.len())
    }
}

impl fmt::Display for InvestmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvestmentType {
    type Err = CalculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                CalculationError::validation(
                    "investment_type",
                    format!(
                        "invalid investment type: {}. Must be one of: {}",
                        s,
                        valid.join(", ")
                    ),
                )
            })
    }
}

/// How a bank-issued note (CDB/LCI/LCA) is remunerated
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Indexation {
    /// Fixed annual rate, in percent
    Fixed { rate: Decimal },
    /// Percentage of CDI (100 = 100% of CDI)
    CdiPercentage { percentage: Decimal },
    /// IPCA plus a spread in percentage points
    IpcaSpread { spread: Decimal },
}

/// An investment variant together with its rate parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Investment {
    Cdb(Indexation),
    Lci(Indexation),
    Lca(Indexation),
    TreasurySelic { spread: Decimal },
    TreasuryIpca { spread: Decimal },
    CdiNote { percentage: Decimal },
    Savings,
    Bitcoin,
}

/// Where the nominal rate comes from, after looking through the variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateTerms {
    Fixed { annual_rate: Decimal },
    Spread { benchmark: Benchmark, spread: Decimal },
    Percentage { benchmark: Benchmark, factor: Decimal },
    Benchmark(Benchmark),
}

impl Investment {
    pub fn investment_type(&self) -> InvestmentType {
        match self {
            Investment::Cdb(Indexation::Fixed { .. }) => InvestmentType::Cdb,
            Investment::Cdb(Indexation::CdiPercentage { .. }) => InvestmentType::CdbCdi,
            Investment::Cdb(Indexation::IpcaSpread { .. }) => InvestmentType::CdbIpca,
            Investment::Lci(Indexation::Fixed { .. }) => InvestmentType::Lci,
            Investment::Lci(Indexation::CdiPercentage { .. }) => InvestmentType::LciCdi,
            Investment::Lci(Indexation::IpcaSpread { .. }) => InvestmentType::LciIpca,
            Investment::Lca(Indexation::Fixed { .. }) => InvestmentType::Lca,
            Investment::Lca(Indexation::CdiPercentage { .. }) => InvestmentType::LcaCdi,
            Investment::Lca(Indexation::IpcaSpread { .. }) => InvestmentType::LcaIpca,
            Investment::TreasurySelic { .. } => InvestmentType::Selic,
            Investment::TreasuryIpca { .. } => InvestmentType::Ipca,
            Investment::CdiNote { .. } => InvestmentType::Cdi,
            Investment::Savings => InvestmentType::Poupanca,
            Investment::Bitcoin => InvestmentType::Btc,
        }
    }

    /// LCI, LCA and savings accounts are exempt from income tax for individuals
    pub fn is_tax_free(&self) -> bool {
        matches!(
            self,
            Investment::Lci(_) | Investment::Lca(_) | Investment::Savings
        )
    }

    /// Bank deposits guaranteed by the FGC
    pub fn is_fgc_eligible(&self) -> bool {
        matches!(
            self,
            Investment::Cdb(_) | Investment::Lci(_) | Investment::Lca(_) | Investment::Savings
        )
    }

    /// Treasury bonds are backed by the federal government instead of the FGC
    pub fn is_government_backed(&self) -> bool {
        matches!(
            self,
            Investment::TreasurySelic { .. } | Investment::TreasuryIpca { .. }
        )
    }

    pub fn is_crypto(&self) -> bool {
        matches!(self, Investment::Bitcoin)
    }

    /// Rate terms with percentages converted to decimal fractions
    pub fn rate_terms(&self) -> RateTerms {
        let hundred = dec!(100);
        match *self {
            Investment::Cdb(ix) | Investment::Lci(ix) | Investment::Lca(ix) => match ix {
                Indexation::Fixed { rate } => RateTerms::Fixed {
                    annual_rate: rate / hundred,
                },
                Indexation::CdiPercentage { percentage } => RateTerms::Percentage {
                    benchmark: Benchmark::Cdi,
                    factor: percentage / hundred,
                },
                Indexation::IpcaSpread { spread } => RateTerms::Spread {
                    benchmark: Benchmark::Ipca,
                    spread: spread / hundred,
                },
            },
            Investment::TreasurySelic { spread } => RateTerms::Spread {
                benchmark: Benchmark::Selic,
                spread: spread / hundred,
            },
            Investment::TreasuryIpca { spread } => RateTerms::Spread {
                benchmark: Benchmark::Ipca,
                spread: spread / hundred,
            },
            Investment::CdiNote { percentage } => RateTerms::Percentage {
                benchmark: Benchmark::Cdi,
                factor: percentage / hundred,
            },
            Investment::Savings => RateTerms::Benchmark(Benchmark::Savings),
            Investment::Bitcoin => RateTerms::Benchmark(Benchmark::Bitcoin),
        }
    }

    /// Benchmark series this variant reads, if any
    pub fn benchmark(&self) -> Option<Benchmark> {
        match self.rate_terms() {
            RateTerms::Fixed { .. } => None,
            RateTerms::Spread { benchmark, .. }
            | RateTerms::Percentage { benchmark, .. }
            | RateTerms::Benchmark(benchmark) => Some(benchmark),
        }
    }

    /// Label used in comparison tables
    pub fn display_label(&self) -> String {
        match *self {
            Investment::Cdb(Indexation::Fixed { .. }) => "CDB".to_string(),
            Investment::Lci(Indexation::Fixed { .. }) => "LCI".to_string(),
            Investment::Lca(Indexation::Fixed { .. }) => "LCA".to_string(),
            Investment::Cdb(Indexation::CdiPercentage { percentage }) => {
                format!("CDB {}% CDI", percentage.normalize())
            }
            Investment::Lci(Indexation::CdiPercentage { percentage }) => {
                format!("LCI {}% CDI", percentage.normalize())
            }
            Investment::Lca(Indexation::CdiPercentage { percentage }) => {
                format!("LCA {}% CDI", percentage.normalize())
            }
            Investment::Cdb(Indexation::IpcaSpread { spread }) => {
                format!("CDB IPCA+{:.2}%", spread)
            }
            Investment::Lci(Indexation::IpcaSpread { spread }) => {
                format!("LCI IPCA+{:.2}%", spread)
            }
            Investment::Lca(Indexation::IpcaSpread { spread }) => {
                format!("LCA IPCA+{:.2}%", spread)
            }
            Investment::TreasurySelic { spread } if spread.is_zero() => "SELIC".to_string(),
            Investment::TreasurySelic { spread } => format!("SELIC+{:.2}%", spread),
            Investment::TreasuryIpca { spread } if spread.is_zero() => "IPCA".to_string(),
            Investment::TreasuryIpca { spread } => format!("IPCA+{:.2}%", spread),
            Investment::CdiNote { percentage } if percentage == dec!(100) => "CDI".to_string(),
            Investment::CdiNote { percentage } => format!("{:.2}% of CDI", percentage),
            Investment::Savings => "Poupança".to_string(),
            Investment::Bitcoin => "Bitcoin".to_string(),
        }
    }
}

/// Raw, optional rate parameters as they arrive from a caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateParams {
    pub rate: Option<Decimal>,
    pub cdb_rate: Option<Decimal>,
    pub lci_rate: Option<Decimal>,
    pub lca_rate: Option<Decimal>,
    pub ipca_spread: Option<Decimal>,
    pub selic_spread: Option<Decimal>,
    pub cdi_percentage: Option<Decimal>,
}

impl RateParams {
    /// Bounds checks shared by every request shape
    pub fn validate(&self) -> Result<(), CalculationError> {
        let positive = [
            ("rate", self.rate),
            ("cdb_rate", self.cdb_rate),
            ("lci_rate", self.lci_rate),
            ("lca_rate", self.lca_rate),
            ("cdi_percentage", self.cdi_percentage),
        ];
        for (field, value) in positive {
            if let Some(v) = value {
                if v <= Decimal::ZERO {
                    return Err(CalculationError::validation(
                        field,
                        "must be positive if provided",
                    ));
                }
            }
        }

        for (field, value) in [
            ("ipca_spread", self.ipca_spread),
            ("selic_spread", self.selic_spread),
        ] {
            if let Some(v) = value {
                if v < Decimal::ZERO {
                    return Err(CalculationError::validation(
                        field,
                        "must be non-negative if provided",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Build the variant for `investment_type`, requiring its parameters
    pub fn into_investment(
        &self,
        investment_type: InvestmentType,
    ) -> Result<Investment, CalculationError> {
        self.validate()?;

        let missing = |parameter: &'static str| CalculationError::MissingRequiredParameter {
            investment_type,
            parameter,
        };
        let fixed = |specific: Option<Decimal>, parameter: &'static str| {
            specific
                .or(self.rate)
                .map(|rate| Indexation::Fixed { rate })
                .ok_or_else(|| missing(parameter))
        };
        let cdi = || {
            self.cdi_percentage
                .map(|percentage| Indexation::CdiPercentage { percentage })
                .ok_or_else(|| missing("cdi_percentage"))
        };
        let ipca = || {
            self.ipca_spread
                .map(|spread| Indexation::IpcaSpread { spread })
                .ok_or_else(|| missing("ipca_spread"))
        };

        let investment = match investment_type {
            InvestmentType::Cdb => Investment::Cdb(fixed(self.cdb_rate, "cdb_rate")?),
            InvestmentType::CdbCdi => Investment::Cdb(cdi()?),
            InvestmentType::CdbIpca => Investment::Cdb(ipca()?),
            InvestmentType::Lci => Investment::Lci(fixed(self.lci_rate, "lci_rate")?),
            InvestmentType::LciCdi => Investment::Lci(cdi()?),
            InvestmentType::LciIpca => Investment::Lci(ipca()?),
            InvestmentType::Lca => Investment::Lca(fixed(self.lca_rate, "lca_rate")?),
            InvestmentType::LcaCdi => Investment::Lca(cdi()?),
            InvestmentType::LcaIpca => Investment::Lca(ipca()?),
            InvestmentType::Selic => Investment::TreasurySelic {
                spread: self.selic_spread.ok_or_else(|| missing("selic_spread"))?,
            },
            InvestmentType::Ipca => Investment::TreasuryIpca {
                spread: self.ipca_spread.ok_or_else(|| missing("ipca_spread"))?,
            },
            InvestmentType::Cdi => Investment::CdiNote {
                percentage: self
                    .cdi_percentage
                    .ok_or_else(|| missing("cdi_percentage"))?,
            },
            InvestmentType::Poupanca => Investment::Savings,
            InvestmentType::Btc => Investment::Bitcoin,
        };
        Ok(investment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("CDB".parse::<InvestmentType>().unwrap(), InvestmentType::Cdb);
        assert_eq!(
            " Lci_Ipca ".parse::<InvestmentType>().unwrap(),
            InvestmentType::LciIpca
        );
        let err = "tesouro".parse::<InvestmentType>().unwrap_err();
        assert!(err.to_string().contains("investment_type"));
    }

    #[test]
    fn test_every_type_round_trips_through_variant() {
        let params = RateParams {
            rate: Some(dec!(12)),
            ipca_spread: Some(dec!(5)),
            selic_spread: Some(dec!(0)),
            cdi_percentage: Some(dec!(110)),
            ..Default::default()
        };
        for t in InvestmentType::ALL {
            let investment = params.into_investment(t).unwrap();
            assert_eq!(investment.investment_type(), t);
        }
    }

    #[test]
    fn test_missing_parameter_is_not_defaulted() {
        let params = RateParams::default();
        let err = params.into_investment(InvestmentType::Cdb).unwrap_err();
        assert_eq!(
            err,
            CalculationError::MissingRequiredParameter {
                investment_type: InvestmentType::Cdb,
                parameter: "cdb_rate",
            }
        );

        let err = params.into_investment(InvestmentType::Selic).unwrap_err();
        assert!(matches!(
            err,
            CalculationError::MissingRequiredParameter {
                parameter: "selic_spread",
                ..
            }
        ));

        assert!(params.into_investment(InvestmentType::Poupanca).is_ok());
        assert!(params.into_investment(InvestmentType::Btc).is_ok());
    }

    #[test]
    fn test_specific_rate_wins_over_generic() {
        let params = RateParams {
            rate: Some(dec!(10)),
            lci_rate: Some(dec!(11)),
            ..Default::default()
        };
        assert_eq!(
            params.into_investment(InvestmentType::Lci).unwrap(),
            Investment::Lci(Indexation::Fixed { rate: dec!(11) })
        );
        assert_eq!(
            params.into_investment(InvestmentType::Lca).unwrap(),
            Investment::Lca(Indexation::Fixed { rate: dec!(10) })
        );
    }

    #[test]
    fn test_validation_rejects_negative_spread() {
        let params = RateParams {
            ipca_spread: Some(dec!(-1)),
            ..Default::default()
        };
        let err = params.into_investment(InvestmentType::Ipca).unwrap_err();
        assert!(matches!(err, CalculationError::Validation { ref field, .. } if field == "ipca_spread"));
    }

    #[test]
    fn test_tax_and_guarantee_classes() {
        let lci = Investment::Lci(Indexation::CdiPercentage {
            percentage: dec!(95),
        });
        assert!(lci.is_tax_free());
        assert!(lci.is_fgc_eligible());

        let selic = Investment::TreasurySelic { spread: dec!(0) };
        assert!(!selic.is_tax_free());
        assert!(!selic.is_fgc_eligible());
        assert!(selic.is_government_backed());

        assert!(!Investment::CdiNote { percentage: dec!(100) }.is_fgc_eligible());
        assert!(!Investment::Bitcoin.is_fgc_eligible());
        assert!(Investment::Savings.is_tax_free());
    }

    #[test]
    fn test_rate_terms_convert_percentages() {
        let terms = Investment::CdiNote {
            percentage: dec!(109),
        }
        .rate_terms();
        assert_eq!(
            terms,
            RateTerms::Percentage {
                benchmark: Benchmark::Cdi,
                factor: dec!(1.09)
            }
        );
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(Investment::TreasurySelic { spread: dec!(0) }.display_label(), "SELIC");
        assert_eq!(
            Investment::TreasurySelic { spread: dec!(3) }.display_label(),
            "SELIC+3.00%"
        );
        assert_eq!(
            Investment::CdiNote { percentage: dec!(109) }.display_label(),
            "109.00% of CDI"
        );
        assert_eq!(
            Investment::Cdb(Indexation::CdiPercentage { percentage: dec!(100) }).display_label(),
            "CDB 100% CDI"
        );
    }
}
