use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LoanTerms;
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, LoanField, Result};
use crate::ledger::LoanLedger;
use crate::repayment::Repayment;
use crate::schedule::check_installment_count;
use crate::types::{Direction, Frequency, LoanId, LoanStatus, RepaymentKind};

/// upper bound on principal, keeps every derived amount inside i64
pub const MAX_PRINCIPAL_MINOR: i64 = 1_000_000_000_000_000;

/// upper bound on interest, 10,000%
pub const MAX_RATE_BPS: i64 = 1_000_000;

/// a lending or borrowing agreement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    id: LoanId,
    direction: Direction,
    counterparty_name: String,
    principal: Money,
    interest_rate: Rate,
    start_date: NaiveDate,
    due_date: NaiveDate,
    frequency: Frequency,
    notes: Option<String>,
    disbursement: Repayment,
}

impl Loan {
    /// validate terms and create the loan together with its disbursement
    pub fn create(terms: LoanTerms) -> Result<Self> {
        let id = Uuid::new_v4();
        let interest_rate = validate_rate(terms.interest_rate_bps)?;
        let counterparty_name = terms.counterparty_name.trim().to_string();
        let disbursement = Repayment::disbursement(id, terms.start_date, terms.principal);

        let loan = Self {
            id,
            direction: terms.direction,
            counterparty_name,
            principal: terms.principal,
            interest_rate,
            start_date: terms.start_date,
            due_date: terms.due_date,
            frequency: terms.frequency,
            notes: normalize_notes(terms.notes),
            disbursement,
        };
        loan.validate()?;
        Ok(loan)
    }

    /// builder for creating loans field by field
    pub fn builder() -> LoanBuilder {
        LoanBuilder::new()
    }

    pub fn id(&self) -> LoanId {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn counterparty_name(&self) -> &str {
        &self.counterparty_name
    }

    pub fn principal(&self) -> Money {
        self.principal
    }

    pub fn interest_rate(&self) -> Rate {
        self.interest_rate
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// the single disbursement recorded when the loan was created
    pub fn disbursement(&self) -> &Repayment {
        &self.disbursement
    }

    /// interest over the life of the loan, rounded half-up
    pub fn interest_amount(&self) -> Result<Money> {
        self.principal.interest_at(self.interest_rate)
    }

    /// principal plus interest
    pub fn total_payable(&self) -> Result<Money> {
        self.principal.checked_add(self.interest_amount()?)
    }

    /// sum of payments recorded against this loan
    pub fn amount_paid(&self, ledger: &LoanLedger) -> Result<Money> {
        ledger.amount_paid(self.id)
    }

    /// paid / payable, clamped to [0, 1]
    pub fn progress_ratio(&self, ledger: &LoanLedger) -> Result<f64> {
        let paid = self.amount_paid(ledger)?;
        self.progress_for(paid)
    }

    /// status as of the given date, evaluated fresh each call
    pub fn status(&self, ledger: &LoanLedger, as_of: NaiveDate) -> Result<LoanStatus> {
        let paid = self.amount_paid(ledger)?;
        self.status_for(paid, as_of)
    }

    /// status as of the provider's current date
    pub fn status_with_time(
        &self,
        ledger: &LoanLedger,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanStatus> {
        self.status(ledger, time_provider.now().date_naive())
    }

    pub(crate) fn progress_for(&self, paid: Money) -> Result<f64> {
        let ratio = paid.ratio_of(self.total_payable()?)?;
        ratio.to_f64().ok_or_else(|| LedgerError::CalculationError {
            message: format!("progress ratio {} is not representable", ratio),
        })
    }

    pub(crate) fn status_for(&self, paid: Money, as_of: NaiveDate) -> Result<LoanStatus> {
        if paid.minor_units() >= self.total_payable()?.minor_units() {
            Ok(LoanStatus::Repaid)
        } else if as_of > self.due_date {
            Ok(LoanStatus::Overdue)
        } else {
            Ok(LoanStatus::Active)
        }
    }

    /// creation rules; also re-checked on edit and on restore
    pub(crate) fn validate(&self) -> Result<()> {
        if self.counterparty_name.trim().is_empty() {
            return Err(LedgerError::invalid(
                LoanField::CounterpartyName,
                "must not be empty",
            ));
        }
        if !self.principal.is_positive() {
            return Err(LedgerError::invalid(
                LoanField::Principal,
                format!("must be greater than zero, got {}", self.principal),
            ));
        }
        if self.principal.minor_units() > MAX_PRINCIPAL_MINOR {
            return Err(LedgerError::invalid(
                LoanField::Principal,
                format!("{} exceeds the supported maximum", self.principal),
            ));
        }
        if self.interest_rate.bps() as i64 > MAX_RATE_BPS {
            return Err(LedgerError::invalid(
                LoanField::InterestRate,
                format!("{} exceeds the supported maximum", self.interest_rate),
            ));
        }
        if self.start_date > self.due_date {
            return Err(LedgerError::InvertedDates {
                start: self.start_date,
                due: self.due_date,
            });
        }
        check_installment_count(self.frequency, self.start_date, self.due_date)?;
        let d = &self.disbursement;
        if d.loan_id() != self.id
            || d.kind() != RepaymentKind::Disbursement
            || d.amount() != self.principal
            || d.date() != self.start_date
        {
            return Err(LedgerError::CalculationError {
                message: format!("disbursement record of loan {} does not match its principal", self.id),
            });
        }
        Ok(())
    }

    /// apply a patch, returning the edited copy and the fields that changed
    ///
    /// `first_payment` is the earliest recorded payment date, if any
    pub(crate) fn patched(
        &self,
        patch: &LoanPatch,
        first_payment: Option<NaiveDate>,
    ) -> Result<(Loan, Vec<LoanField>)> {
        let mut edited = self.clone();
        let mut changed = Vec::new();

        if let Some(name) = &patch.counterparty_name {
            let name = name.trim().to_string();
            if name != edited.counterparty_name {
                edited.counterparty_name = name;
                changed.push(LoanField::CounterpartyName);
            }
        }
        if let Some(direction) = patch.direction {
            if direction != edited.direction {
                edited.direction = direction;
                changed.push(LoanField::Direction);
            }
        }
        if let Some(principal) = patch.principal {
            if principal != edited.principal {
                edited.principal = principal;
                changed.push(LoanField::Principal);
            }
        }
        if let Some(bps) = patch.interest_rate_bps {
            let rate = validate_rate(bps)?;
            if rate != edited.interest_rate {
                edited.interest_rate = rate;
                changed.push(LoanField::InterestRate);
            }
        }
        if let Some(start) = patch.start_date {
            if start != edited.start_date {
                edited.start_date = start;
                changed.push(LoanField::StartDate);
            }
        }
        if let Some(due) = patch.due_date {
            if due != edited.due_date {
                edited.due_date = due;
                changed.push(LoanField::DueDate);
            }
        }
        if let Some(frequency) = patch.frequency {
            if frequency != edited.frequency {
                edited.frequency = frequency;
                changed.push(LoanField::Frequency);
            }
        }
        if let Some(notes) = &patch.notes {
            let notes = normalize_notes(notes.clone());
            if notes != edited.notes {
                edited.notes = notes;
                changed.push(LoanField::Notes);
            }
        }

        if let Some(first) = first_payment {
            if let Some(field) = changed.iter().copied().find(|f| is_locked(*f)) {
                return Err(LedgerError::ScheduleLocked { field });
            }
            if edited.start_date > first {
                return Err(LedgerError::invalid(
                    LoanField::StartDate,
                    format!("must not be after the first payment on {}", first),
                ));
            }
        }

        // same record id, new amount/date
        if changed.contains(&LoanField::Principal) || changed.contains(&LoanField::StartDate) {
            edited.disbursement = Repayment::with_id(
                self.disbursement.id(),
                self.id,
                edited.start_date,
                RepaymentKind::Disbursement,
                edited.principal,
            );
        }

        edited.validate()?;
        Ok((edited, changed))
    }
}

/// fields frozen once a payment exists
fn is_locked(field: LoanField) -> bool {
    matches!(
        field,
        LoanField::Principal | LoanField::InterestRate | LoanField::Direction
    )
}

fn validate_rate(bps: i64) -> Result<Rate> {
    if bps < 0 {
        return Err(LedgerError::invalid(
            LoanField::InterestRate,
            format!("must not be negative, got {} bps", bps),
        ));
    }
    if bps > MAX_RATE_BPS {
        return Err(LedgerError::invalid(
            LoanField::InterestRate,
            format!("{} bps exceeds the supported maximum", bps),
        ));
    }
    Ok(Rate::from_bps(bps as u32))
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

/// partial edit of a loan; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanPatch {
    pub counterparty_name: Option<String>,
    pub direction: Option<Direction>,
    pub principal: Option<Money>,
    pub interest_rate_bps: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub frequency: Option<Frequency>,
    /// `Some(None)` clears the notes
    pub notes: Option<Option<String>>,
}

impl LoanPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counterparty_name(mut self, name: impl Into<String>) -> Self {
        self.counterparty_name = Some(name.into());
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn principal(mut self, principal: Money) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn interest_rate_bps(mut self, bps: i64) -> Self {
        self.interest_rate_bps = Some(bps);
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(Some(notes.into()));
        self
    }

    pub fn clear_notes(mut self) -> Self {
        self.notes = Some(None);
        self
    }
}

/// builder for loans
#[derive(Debug, Default)]
pub struct LoanBuilder {
    direction: Option<Direction>,
    counterparty_name: Option<String>,
    principal: Option<Money>,
    interest_rate_bps: i64,
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    frequency: Frequency,
    notes: Option<String>,
}

impl LoanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn given(self) -> Self {
        self.direction(Direction::Given)
    }

    pub fn taken(self) -> Self {
        self.direction(Direction::Taken)
    }

    pub fn counterparty(mut self, name: impl Into<String>) -> Self {
        self.counterparty_name = Some(name.into());
        self
    }

    pub fn principal(mut self, principal: Money) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn rate_bps(mut self, bps: i64) -> Self {
        self.interest_rate_bps = bps;
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// build; start date defaults to today's system date
    pub fn build(self) -> Result<Loan> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.build_with_time(&time)
    }

    /// build; start date defaults to the provider's current date
    pub fn build_with_time(self, time_provider: &SafeTimeProvider) -> Result<Loan> {
        Loan::create(self.into_terms(time_provider.now().date_naive())?)
    }

    fn into_terms(self, today: NaiveDate) -> Result<LoanTerms> {
        let direction = self.direction.ok_or_else(|| {
            LedgerError::invalid(LoanField::Direction, "given or taken is required")
        })?;
        let principal = self
            .principal
            .ok_or_else(|| LedgerError::invalid(LoanField::Principal, "amount is required"))?;
        let due_date = self
            .due_date
            .ok_or_else(|| LedgerError::invalid(LoanField::DueDate, "due date is required"))?;

        Ok(LoanTerms {
            direction,
            counterparty_name: self.counterparty_name.unwrap_or_default(),
            principal,
            interest_rate_bps: self.interest_rate_bps,
            start_date: self.start_date.unwrap_or(today),
            due_date,
            frequency: self.frequency,
            notes: self.notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Currency;
    use crate::errors::ErrorKind;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn k(minor: i64) -> Money {
        Money::from_minor(minor, Currency::ZMW)
    }

    fn terms() -> LoanTerms {
        LoanTerms::given("John Doe", k(100_000), 500, date(2023, 6, 15), date(2023, 12, 15))
    }

    #[test]
    fn test_create_emits_single_disbursement() {
        let loan = Loan::create(terms()).unwrap();
        let d = loan.disbursement();
        assert_eq!(d.kind(), RepaymentKind::Disbursement);
        assert_eq!(d.amount(), loan.principal());
        assert_eq!(d.date(), loan.start_date());
        assert_eq!(d.loan_id(), loan.id());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Loan::create(terms()).unwrap();
        let b = Loan::create(terms()).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_total_payable() {
        let loan = Loan::create(terms()).unwrap();
        assert_eq!(loan.interest_amount().unwrap(), k(5_000));
        assert_eq!(loan.total_payable().unwrap(), k(105_000));

        // 333.33 at 12.5% = 41.66625 -> 41.67
        let odd = Loan::create(LoanTerms {
            principal: k(33_333),
            interest_rate_bps: 1_250,
            ..terms()
        })
        .unwrap();
        assert_eq!(odd.total_payable().unwrap(), k(37_500));

        let free = Loan::create(LoanTerms {
            interest_rate_bps: 0,
            ..terms()
        })
        .unwrap();
        assert_eq!(free.total_payable().unwrap(), k(100_000));
    }

    #[test]
    fn test_create_validation() {
        let cases = vec![
            (LoanTerms { counterparty_name: "   ".into(), ..terms() }, LoanField::CounterpartyName),
            (LoanTerms { principal: k(0), ..terms() }, LoanField::Principal),
            (LoanTerms { principal: k(-500), ..terms() }, LoanField::Principal),
            (LoanTerms { principal: k(MAX_PRINCIPAL_MINOR + 1), ..terms() }, LoanField::Principal),
            (LoanTerms { interest_rate_bps: -1, ..terms() }, LoanField::InterestRate),
            (LoanTerms { interest_rate_bps: MAX_RATE_BPS + 1, ..terms() }, LoanField::InterestRate),
            (LoanTerms { due_date: date(2023, 6, 14), ..terms() }, LoanField::DueDate),
        ];

        for (terms, field) in cases {
            let err = Loan::create(terms).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{}", err);
            assert_eq!(err.field(), Some(field), "{}", err);
        }
    }

    #[test]
    fn test_same_day_loan_is_valid() {
        let loan = Loan::create(LoanTerms {
            due_date: date(2023, 6, 15),
            ..terms()
        })
        .unwrap();
        assert_eq!(loan.start_date(), loan.due_date());
    }

    #[test]
    fn test_name_and_notes_are_trimmed() {
        let loan = Loan::create(LoanTerms {
            counterparty_name: "  Sarah Williams ".into(),
            notes: Some("   ".into()),
            ..terms()
        })
        .unwrap();
        assert_eq!(loan.counterparty_name(), "Sarah Williams");
        assert_eq!(loan.notes(), None);
    }

    #[test]
    fn test_status_for() {
        let loan = Loan::create(terms()).unwrap();
        assert_eq!(loan.status_for(k(60_000), date(2023, 8, 1)).unwrap(), LoanStatus::Active);
        assert_eq!(loan.status_for(k(60_000), date(2023, 12, 15)).unwrap(), LoanStatus::Active);
        assert_eq!(loan.status_for(k(60_000), date(2024, 1, 1)).unwrap(), LoanStatus::Overdue);
        assert_eq!(loan.status_for(k(105_000), date(2024, 1, 1)).unwrap(), LoanStatus::Repaid);
        assert_eq!(loan.status_for(k(105_000), date(2023, 1, 1)).unwrap(), LoanStatus::Repaid);
    }

    #[test]
    fn test_progress_for() {
        let loan = Loan::create(terms()).unwrap();
        let p = loan.progress_for(k(60_000)).unwrap();
        assert!((p - 0.571428).abs() < 1e-6);
        assert_eq!(loan.progress_for(k(0)).unwrap(), 0.0);
        assert_eq!(loan.progress_for(k(105_000)).unwrap(), 1.0);
    }

    #[test]
    fn test_builder() {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));

        let loan = Loan::builder()
            .taken()
            .counterparty("ABC Bank")
            .principal(k(500_000))
            .rate_bps(1_000)
            .due_date(date(2024, 11, 30))
            .frequency(Frequency::Quarterly)
            .notes("school fees")
            .build_with_time(&time)
            .unwrap();

        assert_eq!(loan.direction(), Direction::Taken);
        assert_eq!(loan.start_date(), date(2024, 3, 1));
        assert_eq!(loan.total_payable().unwrap(), k(550_000));
        assert_eq!(loan.notes(), Some("school fees"));
    }

    #[test]
    fn test_builder_requires_fields() {
        let err = Loan::builder()
            .counterparty("ABC Bank")
            .principal(k(500_000))
            .due_date(date(2030, 1, 1))
            .build()
            .unwrap_err();
        assert_eq!(err.field(), Some(LoanField::Direction));

        let err = Loan::builder()
            .given()
            .counterparty("ABC Bank")
            .due_date(date(2030, 1, 1))
            .build()
            .unwrap_err();
        assert_eq!(err.field(), Some(LoanField::Principal));
    }

    #[test]
    fn test_patch_reissues_disbursement() {
        let loan = Loan::create(terms()).unwrap();
        let patch = LoanPatch::new().principal(k(200_000)).start_date(date(2023, 7, 1));
        let (edited, changed) = loan.patched(&patch, None).unwrap();

        assert_eq!(changed, vec![LoanField::Principal, LoanField::StartDate]);
        assert_eq!(edited.disbursement().id(), loan.disbursement().id());
        assert_eq!(edited.disbursement().amount(), k(200_000));
        assert_eq!(edited.disbursement().date(), date(2023, 7, 1));
    }

    #[test]
    fn test_patch_locks_financial_fields_after_payment() {
        let loan = Loan::create(terms()).unwrap();

        let paid_on = Some(date(2023, 7, 1));

        for patch in [
            LoanPatch::new().principal(k(200_000)),
            LoanPatch::new().interest_rate_bps(600),
            LoanPatch::new().direction(Direction::Taken),
        ] {
            let err = loan.patched(&patch, paid_on).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Invariant);
        }

        // unchanged values are not changes
        let same = LoanPatch::new().principal(k(100_000)).interest_rate_bps(500);
        assert!(loan.patched(&same, paid_on).is_ok());

        let schedule = LoanPatch::new()
            .due_date(date(2024, 6, 15))
            .frequency(Frequency::Weekly)
            .notes("extended");
        let (edited, _) = loan.patched(&schedule, paid_on).unwrap();
        assert_eq!(edited.due_date(), date(2024, 6, 15));
        assert_eq!(edited.frequency(), Frequency::Weekly);
        assert_eq!(edited.notes(), Some("extended"));
    }

    #[test]
    fn test_patch_revalidates() {
        let loan = Loan::create(terms()).unwrap();
        let err = loan
            .patched(&LoanPatch::new().due_date(date(2023, 1, 1)), None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvertedDates { .. }));

        let err = loan
            .patched(&LoanPatch::new().counterparty_name(""), None)
            .unwrap_err();
        assert_eq!(err.field(), Some(LoanField::CounterpartyName));

        let (cleared, _) = Loan::create(terms().notes("x"))
            .unwrap()
            .patched(&LoanPatch::new().clear_notes(), None)
            .unwrap();
        assert_eq!(cleared.notes(), None);
    }

    #[test]
    fn test_patch_start_date_bounded_by_first_payment() {
        let loan = Loan::create(terms()).unwrap();
        let paid_on = Some(date(2023, 7, 1));

        let (moved, changed) = loan.patched(&LoanPatch::new().start_date(date(2023, 6, 1)), paid_on).unwrap();
        assert_eq!(changed, vec![LoanField::StartDate]);
        assert_eq!(moved.disbursement().id(), loan.disbursement().id());
        assert_eq!(moved.disbursement().date(), date(2023, 6, 1));
        assert_eq!(moved.disbursement().amount(), k(100_000));

        assert!(loan.patched(&LoanPatch::new().start_date(date(2023, 7, 1)), paid_on).is_ok());

        let err = loan
            .patched(&LoanPatch::new().start_date(date(2023, 7, 2)), paid_on)
            .unwrap_err();
        assert_eq!(err.field(), Some(LoanField::StartDate));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_patch_rejects_overlong_plan() {
        let loan = Loan::create(terms()).unwrap();
        let err = loan
            .patched(
                &LoanPatch::new().frequency(Frequency::Weekly).due_date(date(2250, 1, 1)),
                None,
            )
            .unwrap_err();
        assert_eq!(err.field(), Some(LoanField::DueDate));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
