use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{LoanId, RepaymentId, RepaymentKind};

/// a single money movement on a loan; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repayment {
    id: RepaymentId,
    loan_id: LoanId,
    date: NaiveDate,
    kind: RepaymentKind,
    amount: Money,
}

impl Repayment {
    pub(crate) fn disbursement(loan_id: LoanId, date: NaiveDate, amount: Money) -> Self {
        Self::with_id(Uuid::new_v4(), loan_id, date, RepaymentKind::Disbursement, amount)
    }

    pub(crate) fn payment(loan_id: LoanId, date: NaiveDate, amount: Money) -> Self {
        Self::with_id(Uuid::new_v4(), loan_id, date, RepaymentKind::Payment, amount)
    }

    pub(crate) fn with_id(
        id: RepaymentId,
        loan_id: LoanId,
        date: NaiveDate,
        kind: RepaymentKind,
        amount: Money,
    ) -> Self {
        Self {
            id,
            loan_id,
            date,
            kind,
            amount,
        }
    }

    pub fn id(&self) -> RepaymentId {
        self.id
    }

    pub fn loan_id(&self) -> LoanId {
        self.loan_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn kind(&self) -> RepaymentKind {
        self.kind
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn is_payment(&self) -> bool {
        self.kind == RepaymentKind::Payment
    }
}

/// insert keeping date order; equal dates keep insertion order
pub(crate) fn insert_chronological(payments: &mut Vec<Repayment>, repayment: Repayment) -> usize {
    let index = payments.partition_point(|p| p.date <= repayment.date);
    payments.insert(index, repayment);
    index
}
