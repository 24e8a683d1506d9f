//! Storage infrastructure - connection pooling, schema and backend selection

mod factory;
pub mod migrations;
mod postgres;

pub use factory::{StorageConfig, StorageFactory, StorageType, Stores};
pub use migrations::{run_migrations, Migration, PostgresMigrator};
pub use postgres::PostgresConfig;
pub(crate) use postgres::storage_error;
