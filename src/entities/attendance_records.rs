//! SeaORM Entity for picket attendance records
//!
//! Append-only shift ledger: one row per picket shift, created at
//! check-in and mutated exactly once at check-out. A partial unique
//! index (`uniq_attendance_open_shift`) guarantees at most one row per
//! (organization, fund, member) with a null `check_out_time`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: String,
    pub strike_fund_id: i32,
    pub member_id: i32,
    pub check_in_time: DateTimeWithTimeZone,
    /// Null while the shift is open
    pub check_out_time: Option<DateTimeWithTimeZone>,
    pub check_in_method: CheckInMethod,
    pub check_in_latitude: Option<f64>,
    pub check_in_longitude: Option<f64>,
    pub check_out_latitude: Option<f64>,
    pub check_out_longitude: Option<f64>,
    pub location_verified: bool,
    /// Set when a coordinator vouched for presence out-of-band
    pub coordinator_override: bool,
    pub override_reason: Option<String>,
    /// Set once at check-out, rounded to 2 decimals
    pub hours_worked: Option<Decimal>,
    pub created_at: Option<DateTimeWithTimeZone>,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum CheckInMethod {
    #[sea_orm(string_value = "nfc")]
    Nfc,
    #[sea_orm(string_value = "qr_code")]
    QrCode,
    #[sea_orm(string_value = "gps")]
    Gps,
    #[sea_orm(string_value = "manual")]
    Manual,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
