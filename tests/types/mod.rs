pub mod bad_migration;
pub mod good_migration;
pub mod good_migration_up_bad_migration_down;
pub mod panicking_migration;

pub use self::bad_migration::BadMigration;
pub use self::good_migration::GoodMigration;
pub use self::good_migration_up_bad_migration_down::GoodMigrationUpBadMigrationDown;
pub use self::panicking_migration::PanickingMigration;
