pub use sea_orm_migration::prelude::*;

mod m20261019_000001_create_schema;
mod m20261019_000002_create_agents;
mod m20261019_000003_create_verification_requests;
mod m20261019_000004_create_activity_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261019_000001_create_schema::Migration),
            Box::new(m20261019_000002_create_agents::Migration),
            Box::new(m20261019_000003_create_verification_requests::Migration),
            Box::new(m20261019_000004_create_activity_logs::Migration),
        ]
    }
}
