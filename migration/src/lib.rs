pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_exchange_rates;
mod m20250601_000002_create_metadata;

pub use m20250601_000002_create_metadata::{SCHEMA_VERSION, SCHEMA_VERSION_KEY};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_exchange_rates::Migration),
            Box::new(m20250601_000002_create_metadata::Migration),
        ]
    }
}
