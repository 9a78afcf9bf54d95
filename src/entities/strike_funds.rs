//! SeaORM Entity for strike funds
//!
//! Fund configuration consumed by the attendance, stipend, and
//! forecasting engines. Fund CRUD itself lives in the dashboard service.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "strike_funds")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Tenant scope, validated upstream (Clerk organization id)
    pub organization_id: String,
    pub name: String,
    pub status: FundStatus,
    /// Current fund balance in dollars
    pub current_balance: Decimal,
    /// Fundraising target used by forecast recommendations
    pub target_balance: Option<Decimal>,
    /// Weekly stipend budget per member; hourly rate derives from this
    pub weekly_stipend_amount: Option<Decimal>,
    /// Hours/week required for stipend eligibility (global default applies when unset)
    pub minimum_hours: Option<Decimal>,
    /// Picket line location for GPS check-in verification
    pub picket_latitude: Option<f64>,
    pub picket_longitude: Option<f64>,
    /// Allowed check-in radius around the picket location (default 100m)
    pub checkin_radius_meters: Option<f64>,
    pub created_at: Option<DateTimeWithTimeZone>,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum FundStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "suspended")]
    Suspended,
    #[sea_orm(string_value = "closed")]
    Closed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
