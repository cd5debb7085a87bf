pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod loan;
pub mod repayment;
pub mod schedule;
pub mod state;
pub mod types;
pub mod views;

// re-export key types
pub use config::{LedgerConfig, LoanTerms};
pub use decimal::{Currency, Money, Rate};
pub use errors::{ErrorKind, LedgerError, LoanField, Result};
pub use events::{Event, EventStore};
pub use ledger::LoanLedger;
pub use loan::{Loan, LoanBuilder, LoanPatch};
pub use repayment::Repayment;
pub use schedule::{Installment, InstallmentSchedule};
pub use state::{LedgerSnapshot, LedgerStore, LoanRecord, MemoryStore};
pub use types::{Direction, Frequency, LoanId, LoanStatus, RepaymentId, RepaymentKind};
pub use views::{DirectionTotals, LoanSummary, LoanView, PortfolioSummary, UpcomingPayment};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
