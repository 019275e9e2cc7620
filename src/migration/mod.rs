//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20250224_000001_create_locations;
mod m20250224_000002_create_users;
mod m20250224_000003_create_images;
mod m20250224_000004_create_annotations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250224_000001_create_locations::Migration),
            Box::new(m20250224_000002_create_users::Migration),
            Box::new(m20250224_000003_create_images::Migration),
            Box::new(m20250224_000004_create_annotations::Migration),
        ]
    }
}
