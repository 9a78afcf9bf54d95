pub use sea_orm_migration::prelude::*;

mod m20260805_000001_create_strike_funds;
mod m20260805_000002_create_attendance_records;
mod m20260805_000003_create_stipend_disbursements;
mod m20260805_000004_create_dues_transactions;
mod m20260805_000005_create_fund_transactions;
mod m20260805_000006_create_arrears_cases;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260805_000001_create_strike_funds::Migration),
            Box::new(m20260805_000002_create_attendance_records::Migration),
            Box::new(m20260805_000003_create_stipend_disbursements::Migration),
            Box::new(m20260805_000004_create_dues_transactions::Migration),
            Box::new(m20260805_000005_create_fund_transactions::Migration),
            Box::new(m20260805_000006_create_arrears_cases::Migration),
        ]
    }
}
