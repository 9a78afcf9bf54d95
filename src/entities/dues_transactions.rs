//! SeaORM Entity for member dues transactions
//!
//! Input surface of the arrears engine. `amount` is the original base
//! amount; `total_amount` is base plus any late fees applied by
//! detection runs. Fees are written additively on each run that selects
//! the transaction (see the arrears service for the caveat).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dues_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: String,
    pub member_id: i32,
    /// Original dues amount, never mutated
    pub amount: Decimal,
    /// amount + accumulated late fees
    pub total_amount: Decimal,
    pub late_fee_amount: Decimal,
    pub status: DuesStatus,
    pub due_date: Date,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub created_at: Option<DateTimeWithTimeZone>,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum DuesStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "waived")]
    Waived,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
