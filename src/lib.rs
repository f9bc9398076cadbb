//! Schema migration runner for the clinic patient-management database.
//!
//! Migrations are plain Rust types implementing [`migration::Migration`], registered in a static
//! [`migration_index::MigrationIndex`]. The index applies pending migrations in name order,
//! recording each success in a [`ledger::Ledger`], or reverts the most recently applied one.

pub mod config;
pub mod ledger;
pub mod migration;
pub mod migration_index;
pub mod migration_name;
pub mod migrations;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

pub use crate::error::Error;
pub use crate::ledger::{Ledger, LedgerEntry, PgLedger};
pub use crate::migration::{BoxError, Direction, Migration};
pub use crate::migration_index::{MigrationIndex, MigrationReport, RollbackOutcome};

mod error;


// A type alias for the result type used by most of the methods in this crate's API.
pub type Result<T> = std::result::Result<T, Error>;

/// A convenience method that automates creating a new, empty database migration from a name and a
/// directory where the new migration file should be created. Returns the new migration's name and
/// the path of the file written. The migration still has to be added to the registry by hand.
///
/// # Examples:
///
/// ```no_run
/// use std::path::Path;
///
/// let migrations_dir = Path::new("src/migrations/");
/// match clinic_migrate::create_migration("add_referrals_table", migrations_dir) {
///     Ok((name, _)) => println!("Created new migration named {}", name),
///     Err(error) => println!("Error creating new database migration: {}", error),
/// }
/// ```
pub fn create_migration(name: &str, migrations_dir: &Path) -> Result<(String, PathBuf)> {
    validate_migration_description(name)?;
    let migration_name = format!("{}_{}", time_prefix(), name);
    let final_path = migrations_dir.join(format!("migration_{}.rs", migration_name));
    // create_new: never clobber an existing migration
    let mut file = OpenOptions::new().write(true).create_new(true).open(&final_path)?;
    file.write_all(migration_template(name, &migration_name).as_bytes())?;
    Ok((migration_name, final_path))
}

fn time_prefix() -> String {
    Utc::now().format("%Y%m%d%H%M%S").to_string()
}

fn validate_migration_description(name: &str) -> Result<()> {
    let valid = name.starts_with(|character: char| character.is_ascii_lowercase())
        && name.chars().all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
        });
    if !valid {
        return Err(Error::Configuration(format!(
            "migration name {:?} must be snake_case, e.g. add_referrals_table", name
        )));
    }
    Ok(())
}

/// Takes a description (e.g. "create_users_table") and the full migration name (e.g.
/// "20240110093000_create_users_table") and returns the source of a new migration file with all
/// the boilerplate a migration requires.
fn migration_template(name: &str, migration_name: &str) -> String {
    // turns "my_migration" into "MyMigration"
    let capitalized_name = name.split('_').flat_map(|word|
        word.chars().enumerate().flat_map(|(index, character)| {
            if index == 0 {
                // some exotic Unicode characters have an uppercase form composed of multiple
                // characters
                character.to_uppercase().collect()
            } else {
                vec![character]
            }
        }).collect::<Vec<char>>()
    ).collect::<String>();

    format!("\
use std::fmt::{{self, Display}};

use postgres::GenericClient;

use crate::migration::{{BoxError, Migration}};

#[derive(Debug)]
pub struct {capitalized_name} {{
    name: String,
}}
impl {capitalized_name} {{
    pub fn new() -> Self {{
        {capitalized_name} {{
            name: \"{migration_name}\".to_owned()
        }}
    }}
}}
impl<G: GenericClient> Migration<G> for {capitalized_name} {{
    fn up(&self, connection: &mut G) -> Result<(), BoxError> {{
        connection.batch_execute(\"Your SQL here.\")?;
        Ok(())
    }}

    fn down(&self, connection: &mut G) -> Result<(), BoxError> {{
        connection.batch_execute(\"Your SQL here.\")?;
        Ok(())
    }}
}}
impl Display for {capitalized_name} {{
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {{
        write!(formatter, \"{{}}\", self.name)
    }}
}}
",
        migration_name=migration_name,
        capitalized_name=capitalized_name
    )
}
