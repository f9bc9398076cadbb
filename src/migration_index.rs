use std::collections::{BTreeMap, HashSet};
use std::process;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::error::Error;
use crate::ledger::{Ledger, LedgerEntry};
use crate::migration::{Direction, Migration};
use crate::migration_name::MigrationName;

use crate::Result;


/// How long to wait for another runner's lock before giving up.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LockOptions {
    /// Zero means fail immediately if the lock is held.
    pub timeout: Duration,
    pub poll_interval: Duration,
}
impl Default for LockOptions {
    fn default() -> Self {
        LockOptions {
            timeout: Duration::from_secs(0),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// What a successful `run` did.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MigrationReport {
    /// names of the migrations applied by this run, in the order they ran
    pub applied: Vec<String>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RollbackOutcome {
    /// The named migration was reverted and its ledger entry removed.
    RolledBack(String),
    /// The ledger was empty.
    NothingToRollBack,
}

/// Where one registered migration stands.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MigrationStatus {
    pub name: String,
    /// None while the migration is pending.
    pub executed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct StatusReport {
    pub migrations: Vec<MigrationStatus>,
    /// ledger entries with no registered migration
    pub orphaned: Vec<LedgerEntry>,
}
impl StatusReport {
    pub fn pending(&self) -> impl Iterator<Item = &MigrationStatus> {
        self.migrations.iter().filter(|status| status.executed_at.is_none())
    }
}

/// Tracks and manages database migrations for this system.
pub struct MigrationIndex<C: ?Sized> {
    /// all database migrations, in order from first to last
    migrations: Vec<Box<dyn Migration<C>>>,
    lock_options: LockOptions,
    lock_holder: String,
}
impl<C: ?Sized> MigrationIndex<C> {
    /// Wraps the given migrations into a new MigrationIndex, sorting them by name. Fails with
    /// `Error::Configuration` if a name is malformed or if two migrations share a name or an
    /// ordering prefix, since their relative order would then be ambiguous.
    pub fn new(mut migrations: Vec<Box<dyn Migration<C>>>) -> Result<Self> {
        let mut by_prefix: BTreeMap<String, String> = BTreeMap::new();
        for migration in migrations.iter() {
            let name = migration.to_string();
            let parsed = MigrationName::parse(&name)?;
            if let Some(existing) = by_prefix.insert(parsed.prefix().to_owned(), name.clone()) {
                if existing == name {
                    return Err(Error::Configuration(format!(
                        "migration {} is registered more than once", name
                    )));
                }
                return Err(Error::Configuration(format!(
                    "migrations {} and {} share the ordering prefix {}",
                    existing, name, parsed.prefix()
                )));
            }
        }
        migrations.sort_by_cached_key(|migration| migration.to_string());
        migrations.shrink_to_fit();
        Ok(MigrationIndex {
            migrations,
            lock_options: LockOptions::default(),
            lock_holder: format!("pid-{}", process::id()),
        })
    }

    pub fn with_lock_options(mut self, lock_options: LockOptions) -> Self {
        self.lock_options = lock_options;
        self
    }

    /// Overrides the identity written into the lock record.
    pub fn with_lock_holder(mut self, holder: impl Into<String>) -> Self {
        self.lock_holder = holder.into();
        self
    }

    /// Registered migration names, in execution order.
    pub fn names(&self) -> Vec<String> {
        self.migrations.iter().map(|migration| migration.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Runs all database migrations that haven't yet been applied to the database, in order. Stops
    /// at the first migration that fails; every migration before it stays applied and recorded.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use postgres::{Client, NoTls};
    /// use clinic_migrate::ledger::PgLedger;
    ///
    /// let mut client = Client::connect("postgresql://localhost/clinic", NoTls)?;
    /// let ledger = PgLedger::default();
    /// let migrations = clinic_migrate::migrations::registry::<Client>()?;
    /// let report = migrations.run(&ledger, &mut client)?;
    /// println!("Applied {} migration(s).", report.applied.len());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn run<L: Ledger<C>>(&self, ledger: &L, connection: &mut C) -> Result<MigrationReport> {
        ledger.ensure_schema(connection)?;
        let applied = ledger.list_applied(connection)?;
        self.warn_orphans(&applied);
        if self.outstanding_migrations(&applied).is_empty() {
            info!("No pending migrations.");
            return Ok(MigrationReport::default());
        }

        self.with_lock(ledger, connection, |connection| {
            // another runner may have finished between the first read and taking the lock
            let applied = ledger.list_applied(connection)?;
            let outstanding = self.outstanding_migrations(&applied);
            debug!("{} pending migration(s)", outstanding.len());

            let mut report = MigrationReport::default();
            for migration in outstanding {
                let name = migration.to_string();
                info!("Running migration {}", name);
                if let Err(source) = migration.up(connection) {
                    error!("Migration {} failed: {}", name, source);
                    return Err(Error::ScriptExecution {
                        name,
                        direction: Direction::Up,
                        source,
                    });
                }
                ledger.record_applied(connection, &name, Utc::now())?;
                info!("Ran migration {}", name);
                report.applied.push(name);
            }
            Ok(report)
        })
    }

    /// Rolls back the last database migration that was successfully applied to the database.
    /// Exactly one migration is reverted per call; an empty or missing ledger is a no-op and
    /// writes nothing. If the migration's down() fails its ledger entry is kept.
    pub fn rollback<L: Ledger<C>>(
        &self, ledger: &L, connection: &mut C
    ) -> Result<RollbackOutcome> {
        if !ledger.is_initialized(connection)? || ledger.latest_applied(connection)?.is_none() {
            info!("No migrations to roll back.");
            return Ok(RollbackOutcome::NothingToRollBack);
        }
        // only the ledger table was checked; the lock table may still be missing
        ledger.ensure_schema(connection)?;

        self.with_lock(ledger, connection, |connection| {
            let latest = match ledger.latest_applied(connection)? {
                Some(latest) => latest,
                None => {
                    info!("No migrations to roll back.");
                    return Ok(RollbackOutcome::NothingToRollBack);
                }
            };
            let migration = self.find(&latest.filename)
                .ok_or_else(|| Error::UnknownMigration(latest.filename.clone()))?;

            info!("Rolling back migration {}", latest.filename);
            if let Err(source) = migration.down(connection) {
                error!("Rollback of migration {} failed: {}", latest.filename, source);
                return Err(Error::ScriptExecution {
                    name: latest.filename,
                    direction: Direction::Down,
                    source,
                });
            }
            ledger.remove_entry(connection, &latest.filename)?;
            info!("Rolled back migration {}", latest.filename);
            Ok(RollbackOutcome::RolledBack(latest.filename))
        })
    }

    /// Reports, for every registered migration, whether and when it was applied. Read only: a
    /// database without a ledger reports every migration as pending.
    pub fn status<L: Ledger<C>>(&self, ledger: &L, connection: &mut C) -> Result<StatusReport> {
        let applied = if ledger.is_initialized(connection)? {
            ledger.list_applied(connection)?
        } else {
            Vec::new()
        };
        let mut executed: BTreeMap<&str, DateTime<Utc>> = applied.iter()
            .map(|entry| (entry.filename.as_str(), entry.executed_at))
            .collect();
        let migrations = self.migrations.iter().map(|migration| {
            let name = migration.to_string();
            let executed_at = executed.remove(name.as_str());
            MigrationStatus { name, executed_at }
        }).collect();
        let orphaned = applied.iter()
            .filter(|entry| executed.contains_key(entry.filename.as_str()))
            .cloned()
            .collect();
        Ok(StatusReport { migrations, orphaned })
    }

    /// Takes the ledger contents and returns all migrations not yet applied, in order from first
    /// to last.
    fn outstanding_migrations(&self, applied: &[LedgerEntry]) -> Vec<&dyn Migration<C>> {
        let applied: HashSet<&str> = applied.iter()
            .map(|entry| entry.filename.as_str())
            .collect();
        self.migrations.iter()
            .filter(|migration| !applied.contains(migration.to_string().as_str()))
            .map(|migration| migration.as_ref())
            .collect()
    }

    fn find(&self, name: &str) -> Option<&dyn Migration<C>> {
        self.migrations.iter()
            .find(|migration| migration.to_string() == name)
            .map(|migration| migration.as_ref())
    }

    fn warn_orphans(&self, applied: &[LedgerEntry]) {
        for entry in applied {
            if self.find(&entry.filename).is_none() {
                warn!(
                    "Ledger records migration {} (applied {}), but it is not registered",
                    entry.filename, entry.executed_at
                );
            }
        }
    }

    /// Holds the migration lock for the duration of `body`. The lock is released whether `body`
    /// succeeds, fails or panics; the body's error wins over a failure to release.
    fn with_lock<L, T, F>(&self, ledger: &L, connection: &mut C, body: F) -> Result<T>
        where L: Ledger<C>,
              F: FnOnce(&mut C) -> Result<T>
    {
        self.acquire_lock(ledger, connection)?;
        let mut guard = MigrationLockGuard {
            ledger,
            connection,
            holder: &self.lock_holder,
            released: false,
        };
        let result = body(guard.connection());
        let released = guard.release();
        match (result, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release_error)) => Err(release_error),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(release_error)) => {
                error!("Failed to release the migration lock: {}", release_error);
                Err(error)
            }
        }
    }

    fn acquire_lock<L: Ledger<C>>(&self, ledger: &L, connection: &mut C) -> Result<()> {
        let start = Instant::now();
        loop {
            let held_by = ledger.try_acquire_lock(connection, &self.lock_holder, Utc::now())?;
            let record = match held_by {
                None => {
                    debug!("Acquired migration lock as {}", self.lock_holder);
                    return Ok(());
                }
                Some(record) => record,
            };
            if start.elapsed() >= self.lock_options.timeout {
                return Err(Error::LockHeld {
                    holder: record.holder,
                    acquired_at: record.acquired_at,
                });
            }
            debug!("Migration lock held by {}, waiting", record.holder);
            thread::sleep(self.lock_options.poll_interval);
        }
    }
}

/// Releases the migration lock when dropped, so a panicking migration doesn't leave the lock row
/// behind. `release` is the normal path and reports its error; the drop path can only log it.
struct MigrationLockGuard<'a, C: ?Sized, L: Ledger<C>> {
    ledger: &'a L,
    connection: &'a mut C,
    holder: &'a str,
    released: bool,
}

impl<'a, C: ?Sized, L: Ledger<C>> MigrationLockGuard<'a, C, L> {
    fn connection(&mut self) -> &mut C {
        &mut *self.connection
    }

    fn release(mut self) -> Result<()> {
        self.released = true;
        self.ledger.release_lock(&mut *self.connection, self.holder)
    }
}

impl<'a, C: ?Sized, L: Ledger<C>> Drop for MigrationLockGuard<'a, C, L> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!("Releasing the migration lock after an interrupted migration");
        if let Err(error) = self.ledger.release_lock(&mut *self.connection, self.holder) {
            error!("Failed to release the migration lock: {}", error);
        }
    }
}
