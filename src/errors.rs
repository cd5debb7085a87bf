use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decimal::{Currency, Money};
use crate::types::LoanId;

/// coarse classification surfaced to the ui layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// bad input shape or value
    Validation,
    /// unknown loan referenced
    NotFound,
    /// operation would break a financial invariant, or stored state already does
    Invariant,
}

/// loan fields named in validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanField {
    CounterpartyName,
    Principal,
    InterestRate,
    StartDate,
    DueDate,
    Direction,
    Frequency,
    Notes,
    PaymentAmount,
    PaymentDate,
}

impl std::fmt::Display for LoanField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoanField::CounterpartyName => "counterparty name",
            LoanField::Principal => "principal",
            LoanField::InterestRate => "interest rate",
            LoanField::StartDate => "start date",
            LoanField::DueDate => "due date",
            LoanField::Direction => "direction",
            LoanField::Frequency => "frequency",
            LoanField::Notes => "notes",
            LoanField::PaymentAmount => "payment amount",
            LoanField::PaymentDate => "payment date",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: LoanField,
        reason: String,
    },

    #[error("start date {start} is after due date {due}")]
    InvertedDates {
        start: NaiveDate,
        due: NaiveDate,
    },

    #[error("payment date {date} is before loan start {start}")]
    PaymentBeforeStart {
        date: NaiveDate,
        start: NaiveDate,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: String,
    },

    #[error("invalid currency: {code}")]
    InvalidCurrency {
        code: String,
    },

    #[error("currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch {
        expected: Currency,
        found: Currency,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("loan already exists: {id}")]
    DuplicateLoan {
        id: LoanId,
    },

    #[error("payment exceeds amount payable: remaining {remaining}, requested {requested}")]
    Overpayment {
        remaining: Money,
        requested: Money,
    },

    #[error("{field} cannot change once payments have been recorded")]
    ScheduleLocked {
        field: LoanField,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidField { .. }
            | LedgerError::InvertedDates { .. }
            | LedgerError::PaymentBeforeStart { .. }
            | LedgerError::InvalidAmount { .. }
            | LedgerError::InvalidCurrency { .. }
            | LedgerError::CurrencyMismatch { .. }
            | LedgerError::InvalidConfiguration { .. } => ErrorKind::Validation,
            LedgerError::LoanNotFound { .. } => ErrorKind::NotFound,
            LedgerError::DuplicateLoan { .. }
            | LedgerError::Overpayment { .. }
            | LedgerError::ScheduleLocked { .. }
            | LedgerError::CalculationError { .. }
            | LedgerError::Storage { .. } => ErrorKind::Invariant,
        }
    }

    /// field the end user should correct, when there is one
    pub fn field(&self) -> Option<LoanField> {
        match self {
            LedgerError::InvalidField { field, .. } | LedgerError::ScheduleLocked { field } => {
                Some(*field)
            }
            LedgerError::InvertedDates { .. } => Some(LoanField::DueDate),
            LedgerError::PaymentBeforeStart { .. } => Some(LoanField::PaymentDate),
            LedgerError::Overpayment { .. } => Some(LoanField::PaymentAmount),
            _ => None,
        }
    }

    pub(crate) fn invalid(field: LoanField, reason: impl Into<String>) -> Self {
        LedgerError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Storage {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_kinds() {
        let id = Uuid::new_v4();
        assert_eq!(LedgerError::LoanNotFound { id }.kind(), ErrorKind::NotFound);
        assert_eq!(
            LedgerError::ScheduleLocked { field: LoanField::Principal }.kind(),
            ErrorKind::Invariant
        );
        assert_eq!(
            LedgerError::invalid(LoanField::CounterpartyName, "must not be empty").kind(),
            ErrorKind::Validation
        );

        let corrupt: LedgerError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(corrupt, LedgerError::Storage { .. }));
        assert_eq!(corrupt.kind(), ErrorKind::Invariant);
    }

    #[test]
    fn test_messages_name_the_field() {
        let err = LedgerError::invalid(LoanField::CounterpartyName, "must not be empty");
        assert_eq!(err.to_string(), "invalid counterparty name: must not be empty");
        assert_eq!(err.field(), Some(LoanField::CounterpartyName));

        let err = LedgerError::ScheduleLocked { field: LoanField::InterestRate };
        assert_eq!(
            err.to_string(),
            "interest rate cannot change once payments have been recorded"
        );
    }
}
