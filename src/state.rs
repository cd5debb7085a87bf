use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::errors::{LedgerError, Result};
use crate::ledger::LoanLedger;
use crate::loan::Loan;
use crate::repayment::Repayment;

pub const SNAPSHOT_VERSION: u32 = 1;

/// one loan and its payments, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub loan: Loan,
    pub payments: Vec<Repayment>,
}

/// full materialized ledger state for load-all / save-all persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub snapshot_id: Uuid,
    pub version: u32,
    pub captured_at: DateTime<Utc>,
    pub config: LedgerConfig,
    /// insertion order
    pub loans: Vec<LoanRecord>,
}

impl LedgerSnapshot {
    pub fn capture(ledger: &LoanLedger, time_provider: &SafeTimeProvider) -> Self {
        Self {
            snapshot_id: Uuid::new_v4(),
            version: SNAPSHOT_VERSION,
            captured_at: time_provider.now(),
            config: ledger.config().clone(),
            loans: ledger.records(),
        }
    }

    /// rebuild a ledger, re-checking every invariant
    pub fn restore(self) -> Result<LoanLedger> {
        if self.version != SNAPSHOT_VERSION {
            return Err(LedgerError::Storage {
                message: format!("unsupported snapshot version {}", self.version),
            });
        }
        let mut ledger = LoanLedger::new(self.config)?;
        for record in self.loans {
            ledger.restore_record(record)?;
        }
        Ok(ledger)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// persistence adapter supplied by the host
pub trait LedgerStore {
    /// latest saved snapshot, if any
    fn load(&self) -> Result<Option<LedgerSnapshot>>;

    fn save(&mut self, snapshot: &LedgerSnapshot) -> Result<()>;
}

/// keeps the last saved snapshot as json in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self) -> Option<&str> {
        self.saved.as_deref()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Option<LedgerSnapshot>> {
        self.saved
            .as_deref()
            .map(LedgerSnapshot::from_json)
            .transpose()
    }

    fn save(&mut self, snapshot: &LedgerSnapshot) -> Result<()> {
        self.saved = Some(snapshot.to_json()?);
        Ok(())
    }
}
