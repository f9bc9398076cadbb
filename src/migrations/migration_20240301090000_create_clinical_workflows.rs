use std::fmt::{self, Display};

use postgres::GenericClient;

use crate::migration::{BoxError, Migration};

#[derive(Debug)]
pub struct CreateClinicalWorkflows {
    name: String,
}
impl CreateClinicalWorkflows {
    pub fn new() -> Self {
        CreateClinicalWorkflows {
            name: "20240301090000_create_clinical_workflows".to_owned()
        }
    }
}
impl<G: GenericClient> Migration<G> for CreateClinicalWorkflows {
    fn up(&self, connection: &mut G) -> Result<(), BoxError> {
        connection.batch_execute("CREATE TABLE clinical_workflows (
    id SERIAL PRIMARY KEY,
    patient_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    prediction_id INTEGER REFERENCES predictions (id) ON DELETE SET NULL,
    assigned_doctor_id INTEGER REFERENCES users (id),
    stage TEXT NOT NULL DEFAULT 'screening'
        CHECK (stage IN ('screening', 'diagnosis', 'treatment', 'follow_up', 'closed')),
    notes TEXT,
    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX idx_clinical_workflows_patient ON clinical_workflows (patient_id);")?;
        Ok(())
    }

    fn down(&self, connection: &mut G) -> Result<(), BoxError> {
        connection.batch_execute("DROP TABLE clinical_workflows;")?;
        Ok(())
    }
}
impl Display for CreateClinicalWorkflows {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.name)
    }
}
