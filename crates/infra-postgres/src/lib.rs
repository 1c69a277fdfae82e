// ERP Intake Infrastructure - PostgreSQL Adapter
// Implements: RegistrationRepository, scoped transactions, migrations

mod config;
mod connection;
mod error;
mod migration;
mod registration_repository;

pub use config::DatabaseConfig;
pub use connection::{connect_options, create_pool, with_transaction};
pub use error::map_sqlx_error;
pub use migration::run_migrations;
pub use registration_repository::PgRegistrationRepository;

// Note: sqlx::Error conversion is handled by map_sqlx_error rather than a
// From impl (orphan rules: AppError lives in core, sqlx::Error in sqlx)
