use sea_orm::DatabaseConnection;
pub use sea_orm_migration::prelude::*;

use tally_common::error::TallyError;

mod m20250801_000001_create_user;
mod m20250801_000002_create_checkin;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250801_000001_create_user::Migration),
            Box::new(m20250801_000002_create_checkin::Migration),
        ]
    }
}

pub async fn migrate(db: &DatabaseConnection) -> Result<(), TallyError> {
    Migrator::up(db, None).await?;
    Ok(())
}
