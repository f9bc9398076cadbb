//! The clinic database's migrations. Record new migrations in `registry()`; order is taken from
//! the names, not from their position in the list.

use postgres::GenericClient;

use crate::migration_index::MigrationIndex;
use crate::Result;

mod migration_20240110093000_create_users_table;
mod migration_20240112141500_create_appointments_table;
mod migration_20240118103000_create_tests_and_predictions;
mod migration_20240205160000_add_risk_level_to_predictions;
mod migration_20240301090000_create_clinical_workflows;

use self::migration_20240110093000_create_users_table::CreateUsersTable;
use self::migration_20240112141500_create_appointments_table::CreateAppointmentsTable;
use self::migration_20240118103000_create_tests_and_predictions::CreateTestsAndPredictions;
use self::migration_20240205160000_add_risk_level_to_predictions::AddRiskLevelToPredictions;
use self::migration_20240301090000_create_clinical_workflows::CreateClinicalWorkflows;

/// Every migration the clinic schema is built from. Run it over a `Client` to apply each
/// migration on its own, or over a `Transaction` to apply a whole run or nothing.
pub fn registry<G: GenericClient>() -> Result<MigrationIndex<G>> {
    MigrationIndex::new(vec![
        // record your migrations here
        Box::new(CreateUsersTable::new()),
        Box::new(CreateAppointmentsTable::new()),
        Box::new(CreateTestsAndPredictions::new()),
        Box::new(AddRiskLevelToPredictions::new()),
        Box::new(CreateClinicalWorkflows::new()),
    ])
}

#[cfg(test)]
mod tests {
    use postgres::{Client, Transaction};

    use super::*;

    #[test]
    fn registry_is_valid_and_ordered() {
        let index = registry::<Client>().unwrap();
        assert_eq!(index.names(), vec![
            "20240110093000_create_users_table",
            "20240112141500_create_appointments_table",
            "20240118103000_create_tests_and_predictions",
            "20240205160000_add_risk_level_to_predictions",
            "20240301090000_create_clinical_workflows",
        ]);
    }

    #[test]
    fn registry_runs_inside_a_transaction() {
        let client_index = registry::<Client>().unwrap();
        let transaction_index = registry::<Transaction<'static>>().unwrap();
        assert_eq!(transaction_index.names(), client_index.names());
    }
}
