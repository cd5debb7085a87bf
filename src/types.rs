use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a repayment record
pub type RepaymentId = Uuid;

/// which side of the agreement the user is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// user lent money out
    Given,
    /// user borrowed money
    Taken,
}

impl Direction {
    /// role of the other party
    pub fn counterparty_role(&self) -> &'static str {
        match self {
            Direction::Given => "borrower",
            Direction::Taken => "lender",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Given => "Loans Given",
            Direction::Taken => "Loans Taken",
        }
    }
}

/// repayment frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    OneTime,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::Monthly
    }
}

/// kind of money movement on a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepaymentKind {
    /// initial transfer of principal
    Disbursement,
    /// money flowing back
    Payment,
}

/// derived loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    Active,
    Overdue,
    /// terminal
    Repaid,
}

impl LoanStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, LoanStatus::Repaid)
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LoanStatus::Active => "Active",
            LoanStatus::Overdue => "Overdue",
            LoanStatus::Repaid => "Repaid",
        };
        f.write_str(s)
    }
}
