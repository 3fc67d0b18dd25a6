pub use sea_orm_migration::prelude::*;

mod iden;
mod m20241103_000001_create_carecard_tables;
mod m20241110_000002_app_user_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241103_000001_create_carecard_tables::Migration),
            Box::new(m20241110_000002_app_user_table::Migration),
        ]
    }
}
