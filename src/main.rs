use std::path::Path;
use std::process;

use docopt::Docopt;
use postgres::{Client, NoTls};
use serde::Deserialize;

use clinic_migrate::config::Config;
use clinic_migrate::migration_index::{MigrationIndex, RollbackOutcome};
use clinic_migrate::{migrations, Error, PgLedger, Result};

const USAGE: &str = "
clinic-migrate - applies and reverts clinic database migrations.

With no command, applies every pending migration in order. `rollback` reverts the single most
recently applied migration.

Usage:
  clinic-migrate [options]
  clinic-migrate rollback [options]
  clinic-migrate status [options]
  clinic-migrate generate <name> [options]
  clinic-migrate (-h | --help)

Options:
  -h --help               Show help text.
  --database-url=<url>    PostgreSQL connection string. Defaults to $DATABASE_URL.
  --dir=<dir>             Where `generate` writes the new migration [default: src/migrations].
  -v --verbose            Debug output.
  -q --quiet              Errors only.
";

#[derive(Debug, Deserialize)]
struct Args {
    cmd_rollback: bool,
    cmd_status: bool,
    cmd_generate: bool,
    arg_name: Option<String>,
    flag_database_url: Option<String>,
    flag_dir: String,
    flag_verbose: bool,
    flag_quiet: bool,
}

fn init_logging(args: &Args) {
    let default_filter = if args.flag_quiet {
        "error"
    } else if args.flag_verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

/// Creates and returns a new database connection, or an error if a connection could not be
/// established.
fn new_connection(database_url: &str) -> Result<Client> {
    Client::connect(database_url, NoTls).map_err(Error::Connection)
}

fn open(args: &Args) -> Result<(PgLedger, Client, MigrationIndex<Client>)> {
    let mut config = Config::from_env()?;
    if let Some(ref url) = args.flag_database_url {
        config.database_url = Some(url.clone());
    }
    let ledger = config.ledger()?;
    let migrations = migrations::registry::<Client>()?.with_lock_options(config.lock_options());
    let connection = new_connection(config.require_database_url()?)?;
    Ok((ledger, connection, migrations))
}

fn run(args: &Args) -> Result<()> {
    if args.cmd_generate {
        let name = args.arg_name.as_deref().unwrap_or_default();
        let (name, path) = clinic_migrate::create_migration(name, Path::new(&args.flag_dir))?;
        println!("Created migration {} at {}", name, path.display());
        println!("Register it in migrations::registry() to have it applied.");
        return Ok(());
    }

    let (ledger, mut connection, migrations) = open(args)?;
    if args.cmd_rollback {
        match migrations.rollback(&ledger, &mut connection)? {
            RollbackOutcome::RolledBack(name) => println!("Rolled back migration {}.", name),
            RollbackOutcome::NothingToRollBack => println!("No migrations to roll back."),
        }
    } else if args.cmd_status {
        let status = migrations.status(&ledger, &mut connection)?;
        for migration in status.migrations.iter() {
            match migration.executed_at {
                Some(executed_at) => println!("applied  {}  {}", executed_at, migration.name),
                None => println!("pending  {}", migration.name),
            }
        }
        for orphan in status.orphaned.iter() {
            println!("unknown  {}  {}", orphan.executed_at, orphan.filename);
        }
        println!(
            "{} applied, {} pending.",
            status.migrations.len() - status.pending().count(),
            status.pending().count()
        );
    } else {
        let report = migrations.run(&ledger, &mut connection)?;
        println!("Applied {} migration(s).", report.applied.len());
    }
    Ok(())
}

fn main() {
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());
    init_logging(&args);

    if let Err(err) = run(&args) {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}
