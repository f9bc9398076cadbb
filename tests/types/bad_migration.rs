use std::fmt::{self, Display};

use clinic_migrate::{BoxError, Migration};

use crate::support::MemoryDatabase;

// this migration is expected to fail when run
#[derive(Debug)]
pub struct BadMigration {
    name: String,
}
impl BadMigration {
    pub fn new(name: &str) -> Self {
        BadMigration {
            name: name.to_owned(),
        }
    }
}
impl Migration<MemoryDatabase> for BadMigration {
    fn up(&self, connection: &mut MemoryDatabase) -> Result<(), BoxError> {
        connection.calls.push(format!("up {}", self.name));
        Err("rargle blargle".into())
    }
    fn down(&self, connection: &mut MemoryDatabase) -> Result<(), BoxError> {
        connection.calls.push(format!("down {}", self.name));
        Err("rargle blargle".into())
    }
}
impl Display for BadMigration {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.name)
    }
}
