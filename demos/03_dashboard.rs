/// dashboard - totals and upcoming payments for the home screen
use chrono::NaiveDate;
use loan_ledger::{Currency, Direction, Frequency, LoanLedger, LoanTerms, Money};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).ok_or("bad date");
    let k = |major| Money::from_major(major, Currency::ZMW);

    let mut ledger = LoanLedger::default();
    let john = ledger.create_loan(LoanTerms::given("John Doe", k(2_500)?, 500, date(2023, 4, 15)?, date(2023, 12, 15)?))?;
    ledger.create_loan(
        LoanTerms::taken("ABC Bank", k(5_000)?, 1_000, date(2023, 5, 30)?, date(2023, 11, 30)?)
            .frequency(Frequency::Monthly),
    )?;
    let sarah = ledger.create_loan(
        LoanTerms::given("Sarah Williams", k(1_000)?, 0, date(2023, 7, 15)?, date(2023, 10, 15)?)
            .frequency(Frequency::OneTime),
    )?;
    ledger.record_payment(john, date(2023, 6, 1)?, k(1_500)?)?;
    ledger.record_payment(sarah, date(2023, 10, 1)?, k(1_000)?)?;

    let today = date(2023, 10, 25)?;
    let portfolio = ledger.portfolio_summary(today)?;
    println!("=== dashboard {} ===\n", today);
    println!("total given outstanding: {}", portfolio.given.outstanding);
    println!("total owed:              {}", portfolio.taken.outstanding);
    println!(
        "active {} / overdue {} / repaid {}",
        portfolio.active_count, portfolio.overdue_count, portfolio.repaid_count
    );

    println!("\nupcoming payments:");
    for payment in ledger.upcoming_payments(today)? {
        println!(
            "  {:<15} {} due {}{}",
            payment.counterparty_name,
            payment.amount_due,
            payment.due_date,
            if payment.is_overdue { " (late)" } else { "" }
        );
    }

    for direction in [Direction::Given, Direction::Taken] {
        println!("\n{}:", direction.label());
        for loan in ledger.list_loans(Some(direction)) {
            let summary = ledger.loan_summary(loan.id(), today)?;
            println!(
                "  {:<15} {} of {} ({:.0}%) {}",
                loan.counterparty_name(),
                summary.amount_paid,
                summary.total_payable,
                summary.progress_percent(),
                summary.status
            );
        }
    }

    Ok(())
}
