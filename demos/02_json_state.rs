/// json state - loan details view and save/load through a store
use chrono::{NaiveDate, TimeZone, Utc};
use loan_ledger::{
    Currency, LedgerConfig, LoanLedger, LoanTerms, MemoryStore, Money, SafeTimeProvider,
    TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2023, 8, 1, 0, 0, 0).unwrap(),
    ));
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).ok_or("bad date");

    let mut ledger = LoanLedger::default();
    let id = ledger.create_loan(
        LoanTerms::given(
            "John Doe",
            Money::from_major(2_500, Currency::ZMW)?,
            0,
            date(2023, 4, 15)?,
            date(2023, 12, 15)?,
        )
        .notes("school fees"),
    )?;
    for month in 5..=7 {
        ledger.record_payment(id, date(2023, month, 1)?, Money::from_major(500, Currency::ZMW)?)?;
    }

    println!("=== loan details ===\n");
    println!("{}\n", ledger.loan_view(id, time.now().date_naive())?.to_json_pretty()?);

    let mut store = MemoryStore::new();
    ledger.save_to(&mut store, &time)?;
    println!("=== saved snapshot ===\n");
    println!("{}\n", store.raw().unwrap_or_default());

    let restored = LoanLedger::load_from(&store, LedgerConfig::default())?;
    let summary = restored.loan_summary(id, time.now().date_naive())?;
    println!(
        "restored: {} of {} paid, {} remaining",
        summary.amount_paid, summary.total_payable, summary.remaining
    );

    Ok(())
}
