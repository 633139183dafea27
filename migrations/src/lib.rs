pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_customer_tables;
mod m20240301_000002_create_sales_order_tables;
mod m20240301_000003_create_quotation_tables;
mod m20240301_000004_create_return_tables;
mod m20240301_000005_create_staff_tables;
mod m20240301_000006_create_invoice_tables;
mod m20240301_000007_create_auth_tables;
mod m20240301_000008_add_critical_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_customer_tables::Migration),
            Box::new(m20240301_000002_create_sales_order_tables::Migration),
            Box::new(m20240301_000003_create_quotation_tables::Migration),
            Box::new(m20240301_000004_create_return_tables::Migration),
            Box::new(m20240301_000005_create_staff_tables::Migration),
            Box::new(m20240301_000006_create_invoice_tables::Migration),
            Box::new(m20240301_000007_create_auth_tables::Migration),
            Box::new(m20240301_000008_add_critical_indexes::Migration),
        ]
    }
}
