use std::fmt::{self, Display};

use clinic_migrate::{BoxError, Migration};

use crate::support::MemoryDatabase;

// this migration has a valid up() but its down() will fail
#[derive(Debug)]
pub struct GoodMigrationUpBadMigrationDown {
    name: String,
}
impl GoodMigrationUpBadMigrationDown {
    pub fn new(name: &str) -> Self {
        GoodMigrationUpBadMigrationDown {
            name: name.to_owned(),
        }
    }
}
impl Migration<MemoryDatabase> for GoodMigrationUpBadMigrationDown {
    fn up(&self, connection: &mut MemoryDatabase) -> Result<(), BoxError> {
        connection.calls.push(format!("up {}", self.name));
        connection.tables.insert(self.name.clone());
        Ok(())
    }
    fn down(&self, connection: &mut MemoryDatabase) -> Result<(), BoxError> {
        connection.calls.push(format!("down {}", self.name));
        Err("rargle blargle".into())
    }
}
impl Display for GoodMigrationUpBadMigrationDown {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.name)
    }
}
