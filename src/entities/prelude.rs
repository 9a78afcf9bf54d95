pub use super::arrears_cases::Entity as ArrearsCases;
pub use super::attendance_records::Entity as AttendanceRecords;
pub use super::dues_transactions::Entity as DuesTransactions;
pub use super::fund_transactions::Entity as FundTransactions;
pub use super::stipend_disbursements::Entity as StipendDisbursements;
pub use super::strike_funds::Entity as StrikeFunds;
