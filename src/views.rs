/// read models handed to screens
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Currency, Money};
use crate::errors::Result;
use crate::loan::Loan;
use crate::repayment::Repayment;
use crate::types::{Direction, LoanId, LoanStatus};

/// derived figures for one loan; every screen reads these instead of recomputing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub loan_id: LoanId,
    pub as_of: NaiveDate,
    pub total_payable: Money,
    pub amount_paid: Money,
    pub remaining: Money,
    /// in [0, 1]
    pub progress_ratio: f64,
    pub status: LoanStatus,
}

impl LoanSummary {
    /// progress for display, 0-100
    pub fn progress_percent(&self) -> f64 {
        self.progress_ratio * 100.0
    }

    pub fn is_overdue(&self) -> bool {
        self.status == LoanStatus::Overdue
    }

    pub fn is_repaid(&self) -> bool {
        self.status == LoanStatus::Repaid
    }
}

/// next expected payment on an open loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingPayment {
    pub loan_id: LoanId,
    pub counterparty_name: String,
    pub direction: Direction,
    pub installment_number: u32,
    pub due_date: NaiveDate,
    /// uncovered part of the installment
    pub amount_due: Money,
    pub is_overdue: bool,
}

/// totals for one direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionTotals {
    pub loan_count: usize,
    pub principal: Money,
    pub total_payable: Money,
    pub amount_paid: Money,
    pub outstanding: Money,
}

impl DirectionTotals {
    pub fn zero(currency: Currency) -> Self {
        Self {
            loan_count: 0,
            principal: Money::zero(currency),
            total_payable: Money::zero(currency),
            amount_paid: Money::zero(currency),
            outstanding: Money::zero(currency),
        }
    }

    pub(crate) fn add(&mut self, loan: &Loan, summary: &LoanSummary) -> Result<()> {
        self.loan_count += 1;
        self.principal = self.principal.checked_add(loan.principal())?;
        self.total_payable = self.total_payable.checked_add(summary.total_payable)?;
        self.amount_paid = self.amount_paid.checked_add(summary.amount_paid)?;
        self.outstanding = self.outstanding.checked_add(summary.remaining)?;
        Ok(())
    }
}

/// dashboard figures across the whole ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub as_of: NaiveDate,
    pub currency: Currency,
    /// money lent out
    pub given: DirectionTotals,
    /// money owed to others
    pub taken: DirectionTotals,
    pub active_count: usize,
    pub overdue_count: usize,
    pub repaid_count: usize,
}

impl PortfolioSummary {
    /// outstanding receivable minus outstanding debt, in minor units
    pub fn net_position_minor(&self) -> i64 {
        self.given.outstanding.minor_units() - self.taken.outstanding.minor_units()
    }

    pub fn loan_count(&self) -> usize {
        self.given.loan_count + self.taken.loan_count
    }
}

/// serializable view of a single loan's details screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanView {
    pub loan: Loan,
    pub summary: LoanSummary,
    pub history: Vec<Repayment>,
    pub next_payment: Option<UpcomingPayment>,
}

impl LoanView {
    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
