use std::fmt::{self, Display};

use postgres::GenericClient;

use crate::migration::{BoxError, Migration};

#[derive(Debug)]
pub struct CreateUsersTable {
    name: String,
}
impl CreateUsersTable {
    pub fn new() -> Self {
        CreateUsersTable {
            name: "20240110093000_create_users_table".to_owned()
        }
    }
}
impl<G: GenericClient> Migration<G> for CreateUsersTable {
    fn up(&self, connection: &mut G) -> Result<(), BoxError> {
        connection.batch_execute("CREATE TABLE users (
    id SERIAL PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    full_name TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('patient', 'doctor', 'admin')),
    date_of_birth DATE,
    specialization TEXT,
    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX idx_users_role ON users (role);")?;
        Ok(())
    }

    fn down(&self, connection: &mut G) -> Result<(), BoxError> {
        connection.batch_execute("DROP TABLE users;")?;
        Ok(())
    }
}
impl Display for CreateUsersTable {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.name)
    }
}
