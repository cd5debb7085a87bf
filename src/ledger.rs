use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info, warn};

use crate::config::{LedgerConfig, LoanTerms};
use crate::decimal::Money;
use crate::errors::{LedgerError, LoanField, Result};
use crate::events::{Event, EventStore};
use crate::loan::{Loan, LoanPatch};
use crate::repayment::{insert_chronological, Repayment};
use crate::schedule::InstallmentSchedule;
use crate::state::{LedgerSnapshot, LedgerStore, LoanRecord};
use crate::types::{Direction, LoanId, LoanStatus};
use crate::views::{DirectionTotals, LoanSummary, LoanView, PortfolioSummary, UpcomingPayment};

#[derive(Debug, Clone)]
struct LoanEntry {
    loan: Loan,
    /// payments only, date ascending
    payments: Vec<Repayment>,
}

/// in-memory owner of all loans and their repayments
#[derive(Debug)]
pub struct LoanLedger {
    config: LedgerConfig,
    entries: Vec<LoanEntry>,
    index: HashMap<LoanId, usize>,
    events: EventStore,
}

impl Default for LoanLedger {
    fn default() -> Self {
        Self {
            config: LedgerConfig::default(),
            entries: Vec::new(),
            index: HashMap::new(),
            events: EventStore::new(),
        }
    }
}

impl LoanLedger {
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: LoanId) -> bool {
        self.index.contains_key(&id)
    }

    fn entry(&self, id: LoanId) -> Result<&LoanEntry> {
        self.index
            .get(&id)
            .map(|&i| &self.entries[i])
            .ok_or(LedgerError::LoanNotFound { id })
    }

    fn entry_mut(&mut self, id: LoanId) -> Result<&mut LoanEntry> {
        match self.index.get(&id) {
            Some(&i) => Ok(&mut self.entries[i]),
            None => Err(LedgerError::LoanNotFound { id }),
        }
    }

    fn check_currency(&self, amount: Money) -> Result<()> {
        if amount.currency() != self.config.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: self.config.currency,
                found: amount.currency(),
            });
        }
        Ok(())
    }

    /// insert a created loan
    pub fn add_loan(&mut self, loan: Loan) -> Result<LoanId> {
        let id = loan.id();
        self.try_add_loan(loan).map_err(|err| {
            warn!(loan_id = %id, error = %err, "loan rejected");
            err
        })
    }

    fn try_add_loan(&mut self, loan: Loan) -> Result<LoanId> {
        let id = loan.id();
        if self.contains(id) {
            return Err(LedgerError::DuplicateLoan { id });
        }
        self.check_currency(loan.principal())?;
        loan.validate()?;
        let total_payable = loan.total_payable()?;

        info!(
            loan_id = %id,
            direction = ?loan.direction(),
            principal = %loan.principal(),
            total_payable = %total_payable,
            "loan created"
        );

        self.events.emit(Event::LoanCreated {
            loan_id: id,
            direction: loan.direction(),
            counterparty_name: loan.counterparty_name().to_string(),
            principal: loan.principal(),
            total_payable,
            disbursement_id: loan.disbursement().id(),
            start_date: loan.start_date(),
            due_date: loan.due_date(),
        });

        self.index.insert(id, self.entries.len());
        self.entries.push(LoanEntry {
            loan,
            payments: Vec::new(),
        });
        Ok(id)
    }

    /// validate terms, create the loan and insert it
    pub fn create_loan(&mut self, terms: LoanTerms) -> Result<LoanId> {
        let loan = Loan::create(terms).map_err(|err| {
            warn!(error = %err, "loan terms rejected");
            err
        })?;
        self.add_loan(loan)
    }

    /// edit a loan; financial terms are frozen once a payment exists
    pub fn edit_loan(&mut self, id: LoanId, patch: LoanPatch) -> Result<Loan> {
        self.try_edit_loan(id, &patch).map_err(|err| {
            warn!(loan_id = %id, error = %err, "loan edit rejected");
            err
        })
    }

    fn try_edit_loan(&mut self, id: LoanId, patch: &LoanPatch) -> Result<Loan> {
        let entry = self.entry(id)?;
        let first_payment = entry.payments.first().map(|p| p.date());
        let (edited, changed) = entry.loan.patched(patch, first_payment)?;
        self.check_currency(edited.principal())?;
        edited.total_payable()?;

        if !changed.is_empty() {
            info!(loan_id = %id, fields = ?changed, "loan edited");
            self.events.emit(Event::LoanEdited {
                loan_id: id,
                changed_fields: changed,
            });
        }

        let entry = self.entry_mut(id)?;
        entry.loan = edited.clone();
        Ok(edited)
    }

    pub fn get_loan(&self, id: LoanId) -> Result<&Loan> {
        self.entry(id).map(|e| &e.loan)
    }

    /// loans in insertion order, optionally filtered by direction
    pub fn list_loans(&self, direction: Option<Direction>) -> Vec<&Loan> {
        self.entries
            .iter()
            .map(|e| &e.loan)
            .filter(|l| direction.map_or(true, |d| l.direction() == d))
            .collect()
    }

    /// payments recorded against a loan, date ascending
    pub fn payments(&self, id: LoanId) -> Result<&[Repayment]> {
        self.entry(id).map(|e| e.payments.as_slice())
    }

    pub fn amount_paid(&self, id: LoanId) -> Result<Money> {
        let entry = self.entry(id)?;
        Self::paid(entry)
    }

    fn paid(entry: &LoanEntry) -> Result<Money> {
        Money::sum(
            entry.loan.principal().currency(),
            entry.payments.iter().map(|p| p.amount()),
        )
    }

    /// record a payment against a loan
    pub fn record_payment(&mut self, loan_id: LoanId, date: NaiveDate, amount: Money) -> Result<Repayment> {
        self.try_record_payment(loan_id, date, amount).map_err(|err| {
            warn!(loan_id = %loan_id, amount = %amount, %date, error = %err, "payment rejected");
            err
        })
    }

    /// record a payment dated today per the provider
    pub fn record_payment_with_time(
        &mut self,
        loan_id: LoanId,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<Repayment> {
        self.record_payment(loan_id, time_provider.now().date_naive(), amount)
    }

    fn try_record_payment(&mut self, loan_id: LoanId, date: NaiveDate, amount: Money) -> Result<Repayment> {
        let entry = self.entry(loan_id)?;
        let loan = &entry.loan;

        if !amount.is_positive() {
            return Err(LedgerError::invalid(
                LoanField::PaymentAmount,
                format!("must be greater than zero, got {}", amount),
            ));
        }
        if amount.currency() != loan.principal().currency() {
            return Err(LedgerError::CurrencyMismatch {
                expected: loan.principal().currency(),
                found: amount.currency(),
            });
        }
        if date < loan.start_date() {
            return Err(LedgerError::PaymentBeforeStart {
                date,
                start: loan.start_date(),
            });
        }

        let total = loan.total_payable()?;
        let paid = Self::paid(entry)?;
        let remaining = total.checked_sub(paid)?;
        if amount.minor_units() > remaining.minor_units() {
            return Err(LedgerError::Overpayment {
                remaining,
                requested: amount,
            });
        }

        let new_paid = paid.checked_add(amount)?;
        let new_remaining = total.checked_sub(new_paid)?;
        let repayment = Repayment::payment(loan_id, date, amount);

        info!(
            loan_id = %loan_id,
            repayment_id = %repayment.id(),
            amount = %amount,
            %date,
            remaining = %new_remaining,
            "payment recorded"
        );

        self.events.emit(Event::PaymentRecorded {
            loan_id,
            repayment_id: repayment.id(),
            amount,
            date,
            amount_paid: new_paid,
            remaining: new_remaining,
        });

        if new_remaining.is_zero() {
            info!(loan_id = %loan_id, "loan repaid");
            self.events.emit(Event::LoanRepaid {
                loan_id,
                total_paid: new_paid,
                final_payment_date: date,
            });
        }

        let entry = self.entry_mut(loan_id)?;
        insert_chronological(&mut entry.payments, repayment.clone());
        Ok(repayment)
    }

    fn summarize(entry: &LoanEntry, as_of: NaiveDate) -> Result<LoanSummary> {
        let loan = &entry.loan;
        let total_payable = loan.total_payable()?;
        let amount_paid = Self::paid(entry)?;
        let remaining = total_payable.checked_sub(amount_paid)?;

        Ok(LoanSummary {
            loan_id: loan.id(),
            as_of,
            total_payable,
            amount_paid,
            remaining,
            progress_ratio: loan.progress_for(amount_paid)?,
            status: loan.status_for(amount_paid, as_of)?,
        })
    }

    /// the one place derived loan figures are computed
    pub fn loan_summary(&self, id: LoanId, as_of: NaiveDate) -> Result<LoanSummary> {
        let summary = Self::summarize(self.entry(id)?, as_of)?;
        debug!(
            loan_id = %id,
            %as_of,
            status = %summary.status,
            progress = summary.progress_ratio,
            "loan summary"
        );
        Ok(summary)
    }

    pub fn loan_summary_with_time(&self, id: LoanId, time_provider: &SafeTimeProvider) -> Result<LoanSummary> {
        self.loan_summary(id, time_provider.now().date_naive())
    }

    /// summary as of today's system date
    pub fn loan_summary_now(&self, id: LoanId) -> Result<LoanSummary> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.loan_summary_with_time(id, &time)
    }

    pub fn status(&self, id: LoanId, as_of: NaiveDate) -> Result<LoanStatus> {
        let entry = self.entry(id)?;
        entry.loan.status_for(Self::paid(entry)?, as_of)
    }

    /// disbursement first, then payments in date order
    pub fn repayment_history(&self, id: LoanId) -> Result<Vec<Repayment>> {
        let entry = self.entry(id)?;
        let mut history = Vec::with_capacity(entry.payments.len() + 1);
        history.push(entry.loan.disbursement().clone());
        history.extend(entry.payments.iter().cloned());
        Ok(history)
    }

    pub fn schedule(&self, id: LoanId) -> Result<InstallmentSchedule> {
        InstallmentSchedule::for_loan(&self.entry(id)?.loan)
    }

    fn next_for(entry: &LoanEntry, as_of: NaiveDate) -> Result<Option<UpcomingPayment>> {
        let paid = Self::paid(entry)?;
        let schedule = InstallmentSchedule::for_loan(&entry.loan)?;
        let next = match schedule.next_unpaid(paid) {
            Some(installment) => installment,
            None => return Ok(None),
        };

        Ok(Some(UpcomingPayment {
            loan_id: entry.loan.id(),
            counterparty_name: entry.loan.counterparty_name().to_string(),
            direction: entry.loan.direction(),
            installment_number: next.number,
            due_date: next.due_date,
            amount_due: next.cumulative.checked_sub(paid)?,
            is_overdue: next.due_date < as_of,
        }))
    }

    /// first installment not yet covered by payments; `None` once repaid
    pub fn next_installment(&self, id: LoanId, as_of: NaiveDate) -> Result<Option<UpcomingPayment>> {
        Self::next_for(self.entry(id)?, as_of)
    }

    /// next installments due within the configured window or already late, soonest first
    pub fn upcoming_payments(&self, as_of: NaiveDate) -> Result<Vec<UpcomingPayment>> {
        let horizon = as_of
            .checked_add_signed(Duration::days(self.config.upcoming_window_days as i64))
            .unwrap_or(NaiveDate::MAX);

        let mut upcoming = Vec::new();
        for entry in &self.entries {
            if let Some(next) = Self::next_for(entry, as_of)? {
                if next.due_date <= horizon {
                    upcoming.push(next);
                }
            }
        }
        // stable: ties keep insertion order
        upcoming.sort_by_key(|p| p.due_date);
        Ok(upcoming)
    }

    /// totals for the home and analytics screens
    pub fn portfolio_summary(&self, as_of: NaiveDate) -> Result<PortfolioSummary> {
        let currency = self.config.currency;
        let mut summary = PortfolioSummary {
            as_of,
            currency,
            given: DirectionTotals::zero(currency),
            taken: DirectionTotals::zero(currency),
            active_count: 0,
            overdue_count: 0,
            repaid_count: 0,
        };

        for entry in &self.entries {
            let loan_summary = Self::summarize(entry, as_of)?;
            match entry.loan.direction() {
                Direction::Given => summary.given.add(&entry.loan, &loan_summary)?,
                Direction::Taken => summary.taken.add(&entry.loan, &loan_summary)?,
            }
            match loan_summary.status {
                LoanStatus::Active => summary.active_count += 1,
                LoanStatus::Overdue => summary.overdue_count += 1,
                LoanStatus::Repaid => summary.repaid_count += 1,
            }
        }

        debug!(%as_of, loans = summary.loan_count(), "portfolio summary");
        Ok(summary)
    }

    /// everything the loan details screen shows
    pub fn loan_view(&self, id: LoanId, as_of: NaiveDate) -> Result<LoanView> {
        let entry = self.entry(id)?;
        Ok(LoanView {
            loan: entry.loan.clone(),
            summary: Self::summarize(entry, as_of)?,
            history: self.repayment_history(id)?,
            next_payment: Self::next_for(entry, as_of)?,
        })
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    /// drain events emitted since the last call
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    pub(crate) fn records(&self) -> Vec<LoanRecord> {
        self.entries
            .iter()
            .map(|e| LoanRecord {
                loan: e.loan.clone(),
                payments: e.payments.clone(),
            })
            .collect()
    }

    /// insert a persisted loan without emitting events
    pub(crate) fn restore_record(&mut self, record: LoanRecord) -> Result<()> {
        let LoanRecord { loan, payments } = record;
        let id = loan.id();
        if self.contains(id) {
            return Err(LedgerError::DuplicateLoan { id });
        }
        self.check_currency(loan.principal())?;
        loan.validate()?;

        let mut entry = LoanEntry {
            loan,
            payments: Vec::with_capacity(payments.len()),
        };
        let total = entry.loan.total_payable()?;
        let mut paid = Money::zero(total.currency());
        for payment in payments {
            if payment.loan_id() != id || !payment.is_payment() {
                return Err(LedgerError::Storage {
                    message: format!("repayment {} does not belong to loan {} as a payment", payment.id(), id),
                });
            }
            if !payment.amount().is_positive() {
                return Err(LedgerError::invalid(
                    LoanField::PaymentAmount,
                    format!("stored payment {} is not positive", payment.id()),
                ));
            }
            if payment.date() < entry.loan.start_date() {
                return Err(LedgerError::PaymentBeforeStart {
                    date: payment.date(),
                    start: entry.loan.start_date(),
                });
            }
            paid = paid.checked_add(payment.amount())?;
            if paid.minor_units() > total.minor_units() {
                return Err(LedgerError::Overpayment {
                    remaining: total.checked_sub(paid.checked_sub(payment.amount())?)?,
                    requested: payment.amount(),
                });
            }
            insert_chronological(&mut entry.payments, payment);
        }

        self.index.insert(id, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn snapshot(&self, time_provider: &SafeTimeProvider) -> LedgerSnapshot {
        LedgerSnapshot::capture(self, time_provider)
    }

    /// save a full snapshot through the host's adapter
    pub fn save_to<S: LedgerStore>(&self, store: &mut S, time_provider: &SafeTimeProvider) -> Result<()> {
        let snapshot = self.snapshot(time_provider);
        store.save(&snapshot)?;
        info!(loans = self.len(), snapshot_id = %snapshot.snapshot_id, "ledger saved");
        Ok(())
    }

    /// load the saved ledger, or an empty one with `config` when nothing was saved
    pub fn load_from<S: LedgerStore>(store: &S, config: LedgerConfig) -> Result<Self> {
        match store.load()? {
            Some(snapshot) => {
                let ledger = snapshot.restore()?;
                info!(loans = ledger.len(), "ledger loaded");
                Ok(ledger)
            }
            None => Self::new(config),
        }
    }
}
