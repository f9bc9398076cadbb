use std::fmt::{self, Display};

use clinic_migrate::{BoxError, Migration};

use crate::support::MemoryDatabase;

// creates a table named after the migration on the way up and drops it on the way down
#[derive(Debug)]
pub struct GoodMigration {
    name: String,
}
impl GoodMigration {
    pub fn new(name: &str) -> Self {
        GoodMigration {
            name: name.to_owned(),
        }
    }
}
impl Migration<MemoryDatabase> for GoodMigration {
    fn up(&self, connection: &mut MemoryDatabase) -> Result<(), BoxError> {
        connection.calls.push(format!("up {}", self.name));
        if !connection.tables.insert(self.name.clone()) {
            return Err(format!("table {} already exists", self.name).into());
        }
        Ok(())
    }
    fn down(&self, connection: &mut MemoryDatabase) -> Result<(), BoxError> {
        connection.calls.push(format!("down {}", self.name));
        if !connection.tables.remove(&self.name) {
            return Err(format!("table {} does not exist", self.name).into());
        }
        Ok(())
    }
}
impl Display for GoodMigration {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.name)
    }
}
