use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, LoanField, Result};
use crate::loan::Loan;
use crate::types::{Frequency, LoanId};

/// guards against absurd weekly plans over centuries
pub const MAX_INSTALLMENTS: usize = 10_000;

/// one expected payment in the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub number: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
    /// amount expected to have been paid once this installment is settled
    pub cumulative: Money,
}

/// expected payment plan derived from a loan's frequency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentSchedule {
    pub loan_id: LoanId,
    pub frequency: Frequency,
    pub total: Money,
    pub installments: Vec<Installment>,
}

impl InstallmentSchedule {
    /// split the total payable evenly over the period dates; last one absorbs the remainder
    pub fn for_loan(loan: &Loan) -> Result<Self> {
        let total = loan.total_payable()?;
        let dates = installment_dates(loan.frequency(), loan.start_date(), loan.due_date())?;

        let count = dates.len() as i64;
        let base = total.minor_units() / count;
        let remainder = total.minor_units() % count;
        let currency = total.currency();

        let mut installments = Vec::with_capacity(dates.len());
        let mut cumulative = Money::zero(currency);
        for (i, due_date) in dates.into_iter().enumerate() {
            let last = i as i64 == count - 1;
            let amount = Money::from_minor(base + if last { remainder } else { 0 }, currency);
            cumulative = cumulative.checked_add(amount)?;
            installments.push(Installment {
                number: i as u32 + 1,
                due_date,
                amount,
                cumulative,
            });
        }

        Ok(Self {
            loan_id: loan.id(),
            frequency: loan.frequency(),
            total,
            installments,
        })
    }

    /// get installment by 1-based number
    pub fn get(&self, number: u32) -> Option<&Installment> {
        number
            .checked_sub(1)
            .and_then(|i| self.installments.get(i as usize))
    }

    /// first installment not covered by the amount paid so far
    pub fn next_unpaid(&self, paid: Money) -> Option<&Installment> {
        self.installments
            .iter()
            .find(|i| i.cumulative.minor_units() > paid.minor_units())
    }

    /// installments whose due date has passed without being covered
    pub fn missed(&self, paid: Money, as_of: NaiveDate) -> Vec<&Installment> {
        self.installments
            .iter()
            .filter(|i| i.due_date < as_of && i.cumulative.minor_units() > paid.minor_units())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.installments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installments.is_empty()
    }
}

fn installment_dates(frequency: Frequency, start: NaiveDate, due: NaiveDate) -> Result<Vec<NaiveDate>> {
    check_installment_count(frequency, start, due)?;
    let mut dates: Vec<NaiveDate> = (1..)
        .map_while(|k| step(frequency, start, k).filter(|d| *d < due))
        .collect();
    dates.push(due);
    Ok(dates)
}

/// reject plans longer than `MAX_INSTALLMENTS`; part of the loan creation rules
pub(crate) fn check_installment_count(frequency: Frequency, start: NaiveDate, due: NaiveDate) -> Result<()> {
    let mut count = 1;
    let mut k: u32 = 1;
    while let Some(next) = step(frequency, start, k) {
        if next >= due {
            break;
        }
        count += 1;
        if count > MAX_INSTALLMENTS {
            return Err(LedgerError::invalid(
                LoanField::DueDate,
                format!(
                    "more than {} {:?} installments between {} and {}",
                    MAX_INSTALLMENTS, frequency, start, due
                ),
            ));
        }
        k += 1;
    }
    Ok(())
}

/// k-th period after start, measured from start so month ends do not drift
fn step(frequency: Frequency, start: NaiveDate, k: u32) -> Option<NaiveDate> {
    match frequency {
        Frequency::OneTime => None,
        Frequency::Weekly => start.checked_add_signed(Duration::weeks(k as i64)),
        Frequency::Monthly => start.checked_add_months(Months::new(k)),
        Frequency::Quarterly => start.checked_add_months(Months::new(k.checked_mul(3)?)),
        Frequency::Yearly => start.checked_add_months(Months::new(k.checked_mul(12)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoanTerms;
    use crate::decimal::Currency;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn k(minor: i64) -> Money {
        Money::from_minor(minor, Currency::ZMW)
    }

    fn loan(frequency: Frequency, start: NaiveDate, due: NaiveDate) -> Loan {
        Loan::create(LoanTerms::given("John Doe", k(100_000), 500, start, due).frequency(frequency)).unwrap()
    }

    #[test]
    fn test_monthly_schedule() {
        let loan = loan(Frequency::Monthly, date(2023, 6, 15), date(2023, 12, 15));
        let schedule = InstallmentSchedule::for_loan(&loan).unwrap();

        let dates: Vec<_> = schedule.installments.iter().map(|i| i.due_date).collect();
        assert_eq!(
            dates,
            vec![
                date(2023, 7, 15),
                date(2023, 8, 15),
                date(2023, 9, 15),
                date(2023, 10, 15),
                date(2023, 11, 15),
                date(2023, 12, 15),
            ]
        );
        assert_eq!(schedule.installments[0].amount, k(17_500));
        assert_eq!(schedule.installments.last().unwrap().cumulative, k(105_000));
    }

    #[test]
    fn test_even_split_and_remainder() {
        let loan = loan(Frequency::Weekly, date(2023, 6, 1), date(2023, 6, 22));
        let schedule = InstallmentSchedule::for_loan(&loan).unwrap();
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule.installments[0].amount, k(35_000));

        let odd = Loan::create(
            LoanTerms::given("Jane", k(100), 0, date(2023, 1, 1), date(2023, 4, 1))
                .frequency(Frequency::Monthly),
        )
        .unwrap();
        let schedule = InstallmentSchedule::for_loan(&odd).unwrap();
        let amounts: Vec<_> = schedule.installments.iter().map(|i| i.amount).collect();
        assert_eq!(amounts, vec![k(33), k(33), k(34)]);
    }

    #[test]
    fn test_one_time_and_same_day() {
        let one_time = loan(Frequency::OneTime, date(2023, 6, 15), date(2023, 12, 15));
        let schedule = InstallmentSchedule::for_loan(&one_time).unwrap();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.installments[0].due_date, date(2023, 12, 15));
        assert_eq!(schedule.installments[0].amount, k(105_000));

        let same_day = loan(Frequency::Monthly, date(2023, 6, 15), date(2023, 6, 15));
        assert_eq!(InstallmentSchedule::for_loan(&same_day).unwrap().len(), 1);
    }

    #[test]
    fn test_month_end_does_not_drift() {
        let loan = loan(Frequency::Monthly, date(2024, 1, 31), date(2024, 4, 30));
        let schedule = InstallmentSchedule::for_loan(&loan).unwrap();
        let dates: Vec<_> = schedule.installments.iter().map(|i| i.due_date).collect();
        assert_eq!(dates, vec![date(2024, 2, 29), date(2024, 3, 31), date(2024, 4, 30)]);
    }

    #[test]
    fn test_next_unpaid_and_missed() {
        let loan = loan(Frequency::Monthly, date(2023, 6, 15), date(2023, 12, 15));
        let schedule = InstallmentSchedule::for_loan(&loan).unwrap();

        assert_eq!(schedule.next_unpaid(k(0)).unwrap().number, 1);
        // covers the first installment exactly
        assert_eq!(schedule.next_unpaid(k(17_500)).unwrap().number, 2);
        assert_eq!(schedule.next_unpaid(k(60_000)).unwrap().number, 4);
        assert!(schedule.next_unpaid(k(105_000)).is_none());

        let missed = schedule.missed(k(17_500), date(2023, 9, 1));
        assert_eq!(missed.len(), 1);
        assert_eq!(missed[0].number, 2);
        assert_eq!(schedule.get(2).unwrap().due_date, date(2023, 8, 15));
        assert!(schedule.get(0).is_none());
    }

    #[test]
    fn test_too_many_installments() {
        assert!(check_installment_count(Frequency::Weekly, date(2023, 6, 1), date(2250, 1, 1)).is_err());
        assert!(check_installment_count(Frequency::Monthly, date(2023, 6, 1), date(2250, 1, 1)).is_ok());
        assert!(check_installment_count(Frequency::OneTime, date(2000, 1, 1), date(9000, 1, 1)).is_ok());

        let err = Loan::create(
            LoanTerms::given("John Doe", k(100_000), 500, date(2023, 6, 1), date(2250, 1, 1))
                .frequency(Frequency::Weekly),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some(LoanField::DueDate));
    }
}
