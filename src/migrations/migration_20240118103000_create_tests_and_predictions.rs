use std::fmt::{self, Display};

use postgres::GenericClient;

use crate::migration::{BoxError, Migration};

// lab tests ordered for a patient, and the risk predictions computed from them
#[derive(Debug)]
pub struct CreateTestsAndPredictions {
    name: String,
}
impl CreateTestsAndPredictions {
    pub fn new() -> Self {
        CreateTestsAndPredictions {
            name: "20240118103000_create_tests_and_predictions".to_owned()
        }
    }
}
impl<G: GenericClient> Migration<G> for CreateTestsAndPredictions {
    fn up(&self, connection: &mut G) -> Result<(), BoxError> {
        let mut transaction = connection.transaction()?;
        transaction.batch_execute("CREATE TABLE tests (
    id SERIAL PRIMARY KEY,
    patient_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    ordered_by INTEGER REFERENCES users (id),
    test_type TEXT NOT NULL,
    result JSONB,
    performed_at TIMESTAMP WITH TIME ZONE,
    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP
);")?;
        transaction.batch_execute("CREATE TABLE predictions (
    id SERIAL PRIMARY KEY,
    patient_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    test_id INTEGER REFERENCES tests (id) ON DELETE SET NULL,
    risk_score DOUBLE PRECISION NOT NULL CHECK (risk_score >= 0 AND risk_score <= 1),
    model_version TEXT NOT NULL,
    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP
);")?;
        transaction.commit()?;
        Ok(())
    }

    fn down(&self, connection: &mut G) -> Result<(), BoxError> {
        connection.batch_execute("DROP TABLE predictions; DROP TABLE tests;")?;
        Ok(())
    }
}
impl Display for CreateTestsAndPredictions {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.name)
    }
}
