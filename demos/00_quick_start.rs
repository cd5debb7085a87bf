/// quick start - minimal example to get started
use loan_ledger::chrono::NaiveDate;
use loan_ledger::{Currency, LoanLedger, LoanTerms, Money};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut ledger = LoanLedger::default();

    // lend K1,000.00 at 5% to be repaid by mid december
    let id = ledger.create_loan(LoanTerms::given(
        "John Doe",
        Money::from_major(1_000, Currency::ZMW)?,
        500,
        NaiveDate::from_ymd_opt(2023, 6, 15).ok_or("bad date")?,
        NaiveDate::from_ymd_opt(2023, 12, 15).ok_or("bad date")?,
    ))?;

    // John pays back K600.00
    ledger.record_payment(
        id,
        NaiveDate::from_ymd_opt(2023, 7, 1).ok_or("bad date")?,
        Money::parse("600.00", Currency::ZMW)?,
    )?;

    let summary = ledger.loan_summary(id, NaiveDate::from_ymd_opt(2023, 8, 1).ok_or("bad date")?)?;
    println!(
        "{} of {} paid ({:.1}%), {} remaining, status {}",
        summary.amount_paid,
        summary.total_payable,
        summary.progress_percent(),
        summary.remaining,
        summary.status
    );

    Ok(())
}
