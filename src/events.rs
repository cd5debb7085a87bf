use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::LoanField;
use crate::types::{Direction, LoanId, RepaymentId};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    LoanCreated {
        loan_id: LoanId,
        direction: Direction,
        counterparty_name: String,
        principal: Money,
        total_payable: Money,
        disbursement_id: RepaymentId,
        start_date: NaiveDate,
        due_date: NaiveDate,
    },
    LoanEdited {
        loan_id: LoanId,
        changed_fields: Vec<LoanField>,
    },
    PaymentRecorded {
        loan_id: LoanId,
        repayment_id: RepaymentId,
        amount: Money,
        date: NaiveDate,
        amount_paid: Money,
        remaining: Money,
    },
    /// cumulative payments reached the total payable
    LoanRepaid {
        loan_id: LoanId,
        total_paid: Money,
        final_payment_date: NaiveDate,
    },
}

impl Event {
    pub fn loan_id(&self) -> LoanId {
        match self {
            Event::LoanCreated { loan_id, .. }
            | Event::LoanEdited { loan_id, .. }
            | Event::PaymentRecorded { loan_id, .. }
            | Event::LoanRepaid { loan_id, .. } => *loan_id,
        }
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}
