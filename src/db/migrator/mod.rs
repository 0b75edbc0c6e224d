use sea_orm_migration::prelude::*;

mod m20250101_initial;
mod m20250110_seed_system_user;
mod m20250215_generation_cache_unique;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_initial::Migration),
            Box::new(m20250110_seed_system_user::Migration),
            Box::new(m20250215_generation_cache_unique::Migration),
        ]
    }
}
