use chrono::{DateTime, Utc};
use postgres::{GenericClient, Row};

use crate::error::Error;
use crate::Result;


pub const DEFAULT_LEDGER_TABLE: &str = "migrations";
pub const DEFAULT_LOCK_TABLE: &str = "migrations_lock";

/// One applied migration, as recorded in the ledger.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LedgerEntry {
    pub filename: String,
    pub executed_at: DateTime<Utc>,
}

/// The current holder of the migration lock.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LockRecord {
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
}

/// Persistent record of which migrations have been applied, plus the advisory lock that keeps two
/// runners from mutating it at the same time. Every operation goes through the connection handle
/// it is given; implementations only carry configuration such as table names.
pub trait Ledger<C: ?Sized> {
    /// Creates the ledger and lock storage if it does not exist yet.
    fn ensure_schema(&self, connection: &mut C) -> Result<()>;

    /// Whether the ledger storage exists. Lets read-only paths avoid creating it.
    fn is_initialized(&self, connection: &mut C) -> Result<bool>;

    /// All applied migrations, sorted by filename.
    fn list_applied(&self, connection: &mut C) -> Result<Vec<LedgerEntry>>;

    /// Records a migration as applied. Fails with `Error::DuplicateEntry` if the filename is
    /// already recorded.
    fn record_applied(
        &self, connection: &mut C, filename: &str, executed_at: DateTime<Utc>
    ) -> Result<()>;

    /// The entry with the greatest `executed_at` (ties go to the greatest filename), or None if
    /// nothing has been applied.
    fn latest_applied(&self, connection: &mut C) -> Result<Option<LedgerEntry>>;

    /// Deletes a ledger entry. Fails with `Error::NotFound` if there is no such entry.
    fn remove_entry(&self, connection: &mut C, filename: &str) -> Result<()>;

    /// Compare-and-set acquisition of the migration lock. Returns None if the lock is now held by
    /// `holder`, or the record of whoever already holds it.
    fn try_acquire_lock(
        &self, connection: &mut C, holder: &str, acquired_at: DateTime<Utc>
    ) -> Result<Option<LockRecord>>;

    /// Releases the lock if `holder` owns it.
    fn release_lock(&self, connection: &mut C, holder: &str) -> Result<()>;
}

/// PostgreSQL ledger. Works over a plain `Client` as well as over an open `Transaction`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PgLedger {
    table: String,
    lock_table: String,
}
impl PgLedger {
    /// Builds a ledger stored in the given tables. Table names are interpolated into SQL, so they
    /// must be plain identifiers.
    pub fn new(table: &str, lock_table: &str) -> Result<Self> {
        validate_identifier(table)?;
        validate_identifier(lock_table)?;
        if table == lock_table {
            return Err(Error::Configuration(format!(
                "the ledger and lock tables must differ (both are {:?})", table
            )));
        }
        Ok(PgLedger {
            table: table.to_owned(),
            lock_table: lock_table.to_owned(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn lock_table(&self) -> &str {
        &self.lock_table
    }

    fn lock_record(&self, connection: &mut impl GenericClient) -> Result<Option<LockRecord>> {
        let row = connection.query_opt(
            &*format!("SELECT holder, acquired_at FROM {} WHERE id = 1", self.lock_table),
            &[]
        )?;
        Ok(row.map(|row| LockRecord {
            holder: row.get(0),
            acquired_at: row.get(1),
        }))
    }
}
impl Default for PgLedger {
    fn default() -> Self {
        PgLedger {
            table: DEFAULT_LEDGER_TABLE.to_owned(),
            lock_table: DEFAULT_LOCK_TABLE.to_owned(),
        }
    }
}

impl<G: GenericClient> Ledger<G> for PgLedger {
    fn ensure_schema(&self, connection: &mut G) -> Result<()> {
        connection.batch_execute(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                filename TEXT PRIMARY KEY,
                executed_at TIMESTAMP WITH TIME ZONE NOT NULL
            );
            CREATE TABLE IF NOT EXISTS {lock_table} (
                id SMALLINT PRIMARY KEY CHECK (id = 1),
                holder TEXT NOT NULL,
                acquired_at TIMESTAMP WITH TIME ZONE NOT NULL
            );",
            table = self.table,
            lock_table = self.lock_table
        ))?;
        Ok(())
    }

    fn is_initialized(&self, connection: &mut G) -> Result<bool> {
        let row = connection.query_one("SELECT to_regclass($1) IS NOT NULL", &[&self.table])?;
        Ok(row.get(0))
    }

    fn list_applied(&self, connection: &mut G) -> Result<Vec<LedgerEntry>> {
        let rows = connection.query(
            &*format!("SELECT filename, executed_at FROM {} ORDER BY filename", self.table),
            &[]
        )?;
        Ok(rows.iter().map(entry_from_row).collect())
    }

    fn record_applied(
        &self, connection: &mut G, filename: &str, executed_at: DateTime<Utc>
    ) -> Result<()> {
        let inserted = connection.execute(
            &*format!(
                "INSERT INTO {} (filename, executed_at) VALUES ($1, $2)
                ON CONFLICT (filename) DO NOTHING",
                self.table
            ),
            &[&filename, &executed_at]
        )?;
        if inserted == 0 {
            return Err(Error::DuplicateEntry(filename.to_owned()));
        }
        Ok(())
    }

    fn latest_applied(&self, connection: &mut G) -> Result<Option<LedgerEntry>> {
        let row = connection.query_opt(
            &*format!(
                "SELECT filename, executed_at FROM {}
                ORDER BY executed_at DESC, filename DESC LIMIT 1",
                self.table
            ),
            &[]
        )?;
        Ok(row.as_ref().map(entry_from_row))
    }

    fn remove_entry(&self, connection: &mut G, filename: &str) -> Result<()> {
        let deleted = connection.execute(
            &*format!("DELETE FROM {} WHERE filename = $1", self.table),
            &[&filename]
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(filename.to_owned()));
        }
        Ok(())
    }

    fn try_acquire_lock(
        &self, connection: &mut G, holder: &str, acquired_at: DateTime<Utc>
    ) -> Result<Option<LockRecord>> {
        // the primary key on id makes this insert the compare-and-set
        let inserted = connection.execute(
            &*format!(
                "INSERT INTO {} (id, holder, acquired_at) VALUES (1, $1, $2)
                ON CONFLICT (id) DO NOTHING",
                self.lock_table
            ),
            &[&holder, &acquired_at]
        )?;
        if inserted == 1 {
            return Ok(None);
        }
        match self.lock_record(connection)? {
            Some(record) => Ok(Some(record)),
            // released between our insert and the read; report it as held so the caller retries
            None => Ok(Some(LockRecord {
                holder: "<released>".to_owned(),
                acquired_at,
            })),
        }
    }

    fn release_lock(&self, connection: &mut G, holder: &str) -> Result<()> {
        connection.execute(
            &*format!("DELETE FROM {} WHERE id = 1 AND holder = $1", self.lock_table),
            &[&holder]
        )?;
        Ok(())
    }
}

fn entry_from_row(row: &Row) -> LedgerEntry {
    LedgerEntry {
        filename: row.get(0),
        executed_at: row.get(1),
    }
}

/// Accepts lowercase SQL identifiers: a letter or underscore followed by letters, digits and
/// underscores, at most 63 bytes (PostgreSQL's limit).
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut characters = name.chars();
    let valid_start = match characters.next() {
        Some(first) => first.is_ascii_lowercase() || first == '_',
        None => false,
    };
    let valid = valid_start
        && name.len() <= 63
        && characters.all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
        });
    if !valid {
        return Err(Error::Configuration(format!("{:?} is not a valid table name", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables() {
        let ledger = PgLedger::default();
        assert_eq!(ledger.table(), "migrations");
        assert_eq!(ledger.lock_table(), "migrations_lock");
    }

    #[test]
    fn rejects_unsafe_table_names() {
        assert!(PgLedger::new("schema_migrations", "schema_migrations_lock").is_ok());
        assert!(PgLedger::new("migrations; DROP TABLE users", "lock").is_err());
        assert!(PgLedger::new("1migrations", "lock").is_err());
        assert!(PgLedger::new("", "lock").is_err());
        assert!(PgLedger::new("Migrations", "lock").is_err());
        assert!(PgLedger::new("same", "same").is_err());
    }
}
