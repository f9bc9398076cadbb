use std::fmt::{self, Display};

use postgres::GenericClient;

use crate::migration::{BoxError, Migration};

#[derive(Debug)]
pub struct CreateAppointmentsTable {
    name: String,
}
impl CreateAppointmentsTable {
    pub fn new() -> Self {
        CreateAppointmentsTable {
            name: "20240112141500_create_appointments_table".to_owned()
        }
    }
}
impl<G: GenericClient> Migration<G> for CreateAppointmentsTable {
    fn up(&self, connection: &mut G) -> Result<(), BoxError> {
        connection.batch_execute("CREATE TABLE appointments (
    id SERIAL PRIMARY KEY,
    patient_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    doctor_id INTEGER NOT NULL REFERENCES users (id),
    scheduled_for TIMESTAMP WITH TIME ZONE NOT NULL,
    status TEXT NOT NULL DEFAULT 'scheduled'
        CHECK (status IN ('scheduled', 'completed', 'cancelled')),
    reason TEXT,
    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX idx_appointments_doctor_scheduled ON appointments (doctor_id, scheduled_for);")?;
        Ok(())
    }

    fn down(&self, connection: &mut G) -> Result<(), BoxError> {
        connection.batch_execute("DROP TABLE appointments;")?;
        Ok(())
    }
}
impl Display for CreateAppointmentsTable {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.name)
    }
}
