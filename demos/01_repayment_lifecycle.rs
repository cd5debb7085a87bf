/// repayment lifecycle - active, overdue and repaid as the clock moves
use chrono::{Duration, TimeZone, Utc};
use loan_ledger::{
    Currency, Frequency, LedgerError, Loan, LoanLedger, LoanPatch, Money, SafeTimeProvider,
    TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== repayment lifecycle ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let mut ledger = LoanLedger::default();

    let loan = Loan::builder()
        .taken()
        .counterparty("ABC Bank")
        .principal(Money::from_major(5_000, Currency::ZMW)?)
        .rate_bps(1_200)
        .due_date(chrono::NaiveDate::from_ymd_opt(2024, 4, 10).unwrap())
        .frequency(Frequency::Monthly)
        .build_with_time(&time)?;
    let id = ledger.add_loan(loan)?;

    let schedule = ledger.schedule(id)?;
    println!("schedule ({} installments):", schedule.len());
    for installment in &schedule.installments {
        println!("  #{} {} {}", installment.number, installment.due_date, installment.amount);
    }

    // two on-time installments
    for _ in 0..2 {
        controller.advance(Duration::days(31));
        let next = ledger
            .next_installment(id, time.now().date_naive())?
            .ok_or("nothing due")?;
        ledger.record_payment_with_time(id, next.amount_due, &time)?;
        let summary = ledger.loan_summary_with_time(id, &time)?;
        println!(
            "\n{}: paid {} -> {:.0}% ({})",
            time.now().format("%Y-%m-%d"),
            next.amount_due,
            summary.progress_percent(),
            summary.status
        );
    }

    // locked once payments exist
    match ledger.edit_loan(id, LoanPatch::new().interest_rate_bps(0)) {
        Err(err @ LedgerError::ScheduleLocked { .. }) => println!("\nedit refused: {}", err),
        other => println!("\nunexpected: {:?}", other),
    }

    // miss the due date
    controller.advance(Duration::days(60));
    let summary = ledger.loan_summary_with_time(id, &time)?;
    println!(
        "\n{}: status {}, {} remaining",
        time.now().format("%Y-%m-%d"),
        summary.status,
        summary.remaining
    );

    // over-paying is refused, the exact balance settles it
    let too_much = summary.remaining.checked_add(Money::from_major(1, Currency::ZMW)?)?;
    if let Err(err) = ledger.record_payment_with_time(id, too_much, &time) {
        println!("refused: {}", err);
    }
    ledger.record_payment_with_time(id, summary.remaining, &time)?;
    println!("final status: {}", ledger.loan_summary_with_time(id, &time)?.status);

    println!("\nevents:");
    for event in ledger.take_events() {
        println!("  {:?}", event);
    }

    Ok(())
}
