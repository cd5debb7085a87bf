use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Currency, Money};
use crate::errors::{LedgerError, Result};
use crate::types::{Direction, Frequency};

/// ledger-wide settings supplied by the host's composition root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// every loan in the ledger is held in this currency
    pub currency: Currency,
    /// how far ahead `upcoming_payments` looks
    pub upcoming_window_days: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency: Currency::ZMW,
            upcoming_window_days: 7,
        }
    }
}

impl LedgerConfig {
    pub fn with_currency(currency: Currency) -> Self {
        Self {
            currency,
            ..Self::default()
        }
    }

    /// load from json; missing keys fall back to defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.upcoming_window_days > 366 {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "upcoming window of {} days exceeds one year",
                    self.upcoming_window_days
                ),
            });
        }
        Ok(())
    }
}

/// loan creation input, as captured by the add-loan form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub direction: Direction,
    pub counterparty_name: String,
    pub principal: Money,
    /// signed so that bad form input reaches validation
    pub interest_rate_bps: i64,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LoanTerms {
    /// money lent to a borrower
    pub fn given(
        counterparty_name: impl Into<String>,
        principal: Money,
        interest_rate_bps: i64,
        start_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            direction: Direction::Given,
            counterparty_name: counterparty_name.into(),
            principal,
            interest_rate_bps,
            start_date,
            due_date,
            frequency: Frequency::Monthly,
            notes: None,
        }
    }

    /// money borrowed from a lender
    pub fn taken(
        counterparty_name: impl Into<String>,
        principal: Money,
        interest_rate_bps: i64,
        start_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            direction: Direction::Taken,
            ..Self::given(counterparty_name, principal, interest_rate_bps, start_date, due_date)
        }
    }

    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.currency, Currency::ZMW);
        assert_eq!(config.upcoming_window_days, 7);
    }

    #[test]
    fn test_config_from_json() {
        let config = LedgerConfig::from_json(
            r#"{"currency":{"code":"USD","exponent":2},"upcoming_window_days":14}"#,
        )
        .unwrap();
        assert_eq!(config.currency, Currency::USD);
        assert_eq!(config.upcoming_window_days, 14);

        let partial = LedgerConfig::from_json(r#"{"upcoming_window_days":3}"#).unwrap();
        assert_eq!(partial.currency, Currency::ZMW);

        assert!(LedgerConfig::from_json(r#"{"upcoming_window_days":400}"#).is_err());
        assert!(LedgerConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_terms_presets() {
        let start = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
        let due = NaiveDate::from_ymd_opt(2023, 12, 15).unwrap();
        let principal = Money::from_minor(100_000, Currency::ZMW);

        let terms = LoanTerms::taken("ABC Bank", principal, 500, start, due)
            .frequency(Frequency::Quarterly)
            .notes("car repair");
        assert_eq!(terms.direction, Direction::Taken);
        assert_eq!(terms.counterparty_name, "ABC Bank");
        assert_eq!(terms.frequency, Frequency::Quarterly);
        assert_eq!(terms.notes.as_deref(), Some("car repair"));
    }
}
