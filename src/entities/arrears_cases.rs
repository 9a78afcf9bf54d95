//! SeaORM Entity for arrears (overdue dues) cases
//!
//! At most one non-terminal case exists per (organization, member),
//! enforced by the partial unique index `uniq_arrears_open_case`.
//! `contact_history` and `payment_schedule` are structured, versioned
//! JSONB sub-records (`ContactLogEntry`, `PaymentSchedule`), not opaque
//! text blobs.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "arrears_cases")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: String,
    /// Human-facing case number: ARR-<timestamp>-<member prefix>
    pub case_number: String,
    pub member_id: i32,
    /// JSON array of dues transaction ids covered by this case
    #[sea_orm(column_type = "JsonBinary")]
    pub transaction_ids: Json,
    pub total_owed: Decimal,
    /// Monotonically non-increasing; hitting 0 auto-resolves the case
    pub remaining_balance: Decimal,
    pub oldest_debt_date: Date,
    pub days_overdue: i32,
    pub escalation_level: i32,
    pub status: ArrearsStatus,
    /// Append-only JSON array of ContactLogEntry
    #[sea_orm(column_type = "JsonBinary")]
    pub contact_history: Json,
    /// Optional PaymentSchedule, set by payment-plan creation
    #[sea_orm(column_type = "JsonBinary")]
    pub payment_schedule: Option<Json>,
    pub resolved_at: Option<DateTimeWithTimeZone>,
    pub created_at: Option<DateTimeWithTimeZone>,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ArrearsStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "payment_plan")]
    PaymentPlan,
    #[sea_orm(string_value = "suspended")]
    Suspended,
    #[sea_orm(string_value = "legal_action")]
    LegalAction,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "written_off")]
    WrittenOff,
}

impl ArrearsStatus {
    /// Fixed status -> escalation level map; terminal statuses reset to 0.
    pub fn escalation_level(&self) -> i32 {
        match self {
            ArrearsStatus::Active => 1,
            ArrearsStatus::PaymentPlan => 2,
            ArrearsStatus::Suspended => 3,
            ArrearsStatus::LegalAction => 4,
            ArrearsStatus::Resolved | ArrearsStatus::WrittenOff => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ArrearsStatus::Resolved | ArrearsStatus::WrittenOff)
    }
}

/// One entry in the append-only contact log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactLogEntry {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub timestamp: DateTimeWithTimeZone,
    pub contact_type: ContactType,
    pub notes: String,
    pub outcome: Option<String>,
    pub performed_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    Phone,
    Email,
    Sms,
    InPerson,
    Letter,
}

/// Installment plan attached to a case in payment_plan status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSchedule {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub installment_amount: Decimal,
    pub frequency: InstallmentFrequency,
    pub installments: Vec<Installment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub sequence: u32,
    pub due_date: Date,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentFrequency {
    Weekly,
    Biweekly,
    Monthly,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
