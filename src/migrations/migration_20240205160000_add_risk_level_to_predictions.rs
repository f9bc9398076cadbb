use std::fmt::{self, Display};

use postgres::GenericClient;

use crate::migration::{BoxError, Migration};

/// Score at or above which a prediction is reported as high risk.
const HIGH_RISK_THRESHOLD: f64 = 0.7;
const MEDIUM_RISK_THRESHOLD: f64 = 0.3;

#[derive(Debug)]
pub struct AddRiskLevelToPredictions {
    name: String,
}
impl AddRiskLevelToPredictions {
    pub fn new() -> Self {
        AddRiskLevelToPredictions {
            name: "20240205160000_add_risk_level_to_predictions".to_owned()
        }
    }
}
impl<G: GenericClient> Migration<G> for AddRiskLevelToPredictions {
    fn up(&self, connection: &mut G) -> Result<(), BoxError> {
        let mut transaction = connection.transaction()?;
        transaction.batch_execute(
            "ALTER TABLE predictions ADD COLUMN risk_level TEXT
                CHECK (risk_level IN ('low', 'medium', 'high'));"
        )?;
        // backfill existing rows from their score
        transaction.execute(
            "UPDATE predictions SET risk_level = CASE
                WHEN risk_score >= $1 THEN 'high'
                WHEN risk_score >= $2 THEN 'medium'
                ELSE 'low'
            END",
            &[&HIGH_RISK_THRESHOLD, &MEDIUM_RISK_THRESHOLD]
        )?;
        transaction.batch_execute("ALTER TABLE predictions ALTER COLUMN risk_level SET NOT NULL;")?;
        transaction.commit()?;
        Ok(())
    }

    fn down(&self, connection: &mut G) -> Result<(), BoxError> {
        connection.batch_execute("ALTER TABLE predictions DROP COLUMN risk_level;")?;
        Ok(())
    }
}
impl Display for AddRiskLevelToPredictions {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.name)
    }
}
