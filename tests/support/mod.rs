//! An in-memory stand-in for the clinic database, so the runner can be exercised without a
//! PostgreSQL server.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use clinic_migrate::ledger::{Ledger, LedgerEntry, LockRecord};
use clinic_migrate::{Error, Result};


#[derive(Debug, Default)]
pub struct MemoryDatabase {
    /// set once the ledger storage has been created
    pub initialized: bool,
    /// schema-visible state the test migrations create and drop
    pub tables: BTreeSet<String>,
    /// migration name -> executed_at
    pub ledger: BTreeMap<String, DateTime<Utc>>,
    pub lock: Option<LockRecord>,
    /// every up()/down() invocation, in order, e.g. "up 01_a"
    pub calls: Vec<String>,
    /// number of writes made to the ledger or lock
    pub writes: usize,
}
impl MemoryDatabase {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn applied(&self) -> Vec<String> {
        self.ledger.keys().cloned().collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryLedger;

impl Ledger<MemoryDatabase> for MemoryLedger {
    fn ensure_schema(&self, connection: &mut MemoryDatabase) -> Result<()> {
        if !connection.initialized {
            connection.initialized = true;
            connection.writes += 1;
        }
        Ok(())
    }

    fn is_initialized(&self, connection: &mut MemoryDatabase) -> Result<bool> {
        Ok(connection.initialized)
    }

    fn list_applied(&self, connection: &mut MemoryDatabase) -> Result<Vec<LedgerEntry>> {
        Ok(connection.ledger.iter().map(|(filename, executed_at)| LedgerEntry {
            filename: filename.clone(),
            executed_at: *executed_at,
        }).collect())
    }

    fn record_applied(
        &self, connection: &mut MemoryDatabase, filename: &str, executed_at: DateTime<Utc>
    ) -> Result<()> {
        if connection.ledger.contains_key(filename) {
            return Err(Error::DuplicateEntry(filename.to_owned()));
        }
        connection.ledger.insert(filename.to_owned(), executed_at);
        connection.writes += 1;
        Ok(())
    }

    fn latest_applied(&self, connection: &mut MemoryDatabase) -> Result<Option<LedgerEntry>> {
        Ok(connection.ledger.iter()
            .max_by(|left, right| left.1.cmp(right.1).then_with(|| left.0.cmp(right.0)))
            .map(|(filename, executed_at)| LedgerEntry {
                filename: filename.clone(),
                executed_at: *executed_at,
            }))
    }

    fn remove_entry(&self, connection: &mut MemoryDatabase, filename: &str) -> Result<()> {
        if connection.ledger.remove(filename).is_none() {
            return Err(Error::NotFound(filename.to_owned()));
        }
        connection.writes += 1;
        Ok(())
    }

    fn try_acquire_lock(
        &self, connection: &mut MemoryDatabase, holder: &str, acquired_at: DateTime<Utc>
    ) -> Result<Option<LockRecord>> {
        if let Some(ref record) = connection.lock {
            return Ok(Some(record.clone()));
        }
        connection.lock = Some(LockRecord {
            holder: holder.to_owned(),
            acquired_at,
        });
        connection.writes += 1;
        Ok(None)
    }

    fn release_lock(&self, connection: &mut MemoryDatabase, holder: &str) -> Result<()> {
        let owned = connection.lock.as_ref().map_or(false, |record| record.holder == holder);
        if owned {
            connection.lock = None;
            connection.writes += 1;
        }
        Ok(())
    }
}
