//! Error handling for NestEgg
//!
//! Defines the typed errors raised by the calculation engine and the rate
//! providers, and establishes a unified Result type using anyhow for context
//! chaining in the application layers.

use chrono::NaiveDate;
use thiserror::Error;

use crate::investments::InvestmentType;
use crate::rates::Benchmark;

/// Errors raised by the calculation engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculationError {
    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("missing required parameter '{parameter}' for {investment_type} investments")]
    MissingRequiredParameter {
        investment_type: InvestmentType,
        parameter: &'static str,
    },

    #[error("invalid period: end date {end} must be after start date {start}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },

    #[error("no historical or projectable data available for {benchmark}")]
    BenchmarkUnavailable { benchmark: Benchmark },
}

impl CalculationError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        CalculationError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Errors raised while fetching rate series from upstream providers
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned status {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("offline mode: no cached {0} series")]
    Offline(Benchmark),
}

impl ProviderError {
    /// Transport failures and 429/5xx responses are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ProviderError::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            ProviderError::ParseError(_) | ProviderError::Offline(_) => false,
        }
    }
}

/// Result type alias for application operations
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting_is_readable() {
        let err = CalculationError::validation("amount", "must be positive");
        assert_eq!(err.to_string(), "validation error: amount: must be positive");
    }

    #[test]
    fn test_missing_parameter_names_field_and_type() {
        let err = CalculationError::MissingRequiredParameter {
            investment_type: InvestmentType::Cdb,
            parameter: "cdb_rate",
        };
        let msg = err.to_string();
        assert!(msg.contains("cdb_rate"));
        assert!(msg.contains("cdb"));
    }

    #[test]
    fn test_anyhow_context_chains_errors() {
        use anyhow::Context;
        let result: Result<()> = Err(anyhow::Error::new(CalculationError::BenchmarkUnavailable {
            benchmark: Benchmark::Ipca,
        }))
        .context("failed to calculate investment");
        match result {
            Err(e) => {
                assert!(e.to_string().contains("failed to calculate investment"));
                assert!(e.downcast_ref::<CalculationError>().is_some());
            }
            Ok(_) => panic!("expected error"),
        }
    }

    #[test]
    fn test_status_retry_classification() {
        let busy = ProviderError::Status {
            provider: "BCB",
            status: 503,
        };
        assert!(busy.is_retryable());

        let missing = ProviderError::Status {
            provider: "BCB",
            status: 404,
        };
        assert!(!missing.is_retryable());
        assert!(!ProviderError::ParseError("bad".into()).is_retryable());
    }
}
