//! SeaORM Entity for strike fund cash-flow transactions
//!
//! The forecasting engine reads this ledger: donations and dues
//! payments are deposits, stipend payments and expenses are
//! withdrawals.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fund_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: String,
    pub strike_fund_id: i32,
    pub transaction_type: FundTransactionType,
    pub amount: Decimal,
    pub member_id: Option<i32>,
    pub description: Option<String>,
    pub occurred_at: DateTimeWithTimeZone,
    pub created_at: Option<DateTimeWithTimeZone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum FundTransactionType {
    #[sea_orm(string_value = "donation")]
    Donation,
    #[sea_orm(string_value = "dues_payment")]
    DuesPayment,
    #[sea_orm(string_value = "stipend_payment")]
    StipendPayment,
    #[sea_orm(string_value = "expense")]
    Expense,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

impl FundTransactionType {
    /// Deposits add to the fund balance; everything else draws it down.
    pub fn is_deposit(&self) -> bool {
        matches!(self, Self::Donation | Self::DuesPayment)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
