use std::io;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::migration::{BoxError, Direction};


#[derive(Debug, Error)]
pub enum Error {
    /// The database could not be reached. Nothing has been attempted yet.
    #[error("Failed to connect to the database. The specific error is: {0}")]
    Connection(#[source] postgres::Error),

    /// A migration's up() or down() returned an error. The ledger reflects only the migrations
    /// that completed before it.
    #[error("The {direction}() method of database migration {name} failed. The specific error is: {source}")]
    ScriptExecution {
        name: String,
        direction: Direction,
        #[source]
        source: BoxError,
    },

    #[error("Migration {0} is already recorded in the ledger")]
    DuplicateEntry(String),

    #[error("No ledger entry exists for migration {0}")]
    NotFound(String),

    /// The ledger names a migration that is not part of the registry.
    #[error("The ledger records migration {0}, but no such migration is registered")]
    UnknownMigration(String),

    #[error("Invalid migration configuration: {0}")]
    Configuration(String),

    #[error("The migration lock is held by {holder} (acquired at {acquired_at})")]
    LockHeld {
        holder: String,
        acquired_at: DateTime<Utc>,
    },

    #[error("Database error: {0}")]
    Database(#[from] postgres::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
