pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_clients_table;
mod m20250301_000002_create_roles_users_tables;
mod m20250301_000003_create_customers_table;
mod m20250301_000004_create_projects_table;
mod m20250301_000005_create_blueprints_table;
mod m20250301_000006_create_estimates_table;
mod m20250301_000007_create_estimate_materials_table;
mod m20250301_000008_create_materials_tables;
mod m20250301_000009_create_labor_rates_table;
mod m20250301_000010_create_billing_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_clients_table::Migration),
            Box::new(m20250301_000002_create_roles_users_tables::Migration),
            Box::new(m20250301_000003_create_customers_table::Migration),
            Box::new(m20250301_000004_create_projects_table::Migration),
            Box::new(m20250301_000005_create_blueprints_table::Migration),
            Box::new(m20250301_000006_create_estimates_table::Migration),
            Box::new(m20250301_000007_create_estimate_materials_table::Migration),
            Box::new(m20250301_000008_create_materials_tables::Migration),
            Box::new(m20250301_000009_create_labor_rates_table::Migration),
            Box::new(m20250301_000010_create_billing_tables::Migration),
        ]
    }
}
