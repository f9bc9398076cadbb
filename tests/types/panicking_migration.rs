use std::fmt::{self, Display};

use clinic_migrate::{BoxError, Migration};

use crate::support::MemoryDatabase;

// panics halfway through instead of returning an error
#[derive(Debug)]
pub struct PanickingMigration {
    name: String,
}
impl PanickingMigration {
    pub fn new(name: &str) -> Self {
        PanickingMigration {
            name: name.to_owned(),
        }
    }
}
impl Migration<MemoryDatabase> for PanickingMigration {
    fn up(&self, connection: &mut MemoryDatabase) -> Result<(), BoxError> {
        connection.calls.push(format!("up {}", self.name));
        panic!("migration {} panicked", self.name);
    }
    fn down(&self, connection: &mut MemoryDatabase) -> Result<(), BoxError> {
        connection.calls.push(format!("down {}", self.name));
        panic!("migration {} panicked", self.name);
    }
}
impl Display for PanickingMigration {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.name)
    }
}
