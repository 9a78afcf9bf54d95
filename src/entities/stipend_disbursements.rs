//! SeaORM Entity for weekly stipend disbursements
//!
//! Status moves strictly forward: pending -> approved -> paid.
//! Transitions are written with a conditional update filtered on the
//! expected current status, so a stale writer loses the race instead
//! of skipping a state.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stipend_disbursements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: String,
    pub strike_fund_id: i32,
    pub member_id: i32,
    pub amount: Decimal,
    pub week_start_date: Date,
    pub week_end_date: Date,
    pub status: DisbursementStatus,
    pub payment_method: Option<String>,
    pub approved_by: Option<String>,
    /// Payment processor transaction id, set on mark-paid
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTimeWithTimeZone>,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum DisbursementStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "paid")]
    Paid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
