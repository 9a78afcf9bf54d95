use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StipendEligibility {
    pub member_id: i32,
    pub total_hours: Decimal,
    pub eligible: bool,
    pub stipend_amount: Decimal,
    /// Human-readable shortfall explanation for ineligible members.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekQuery {
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDisbursementRequest {
    pub strike_fund_id: i32,
    pub member_id: i32,
    pub amount: Decimal,
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    pub approved_by: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidRequest {
    /// Omit to have the engine request a payout from the payment
    /// processor and record its transaction id.
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchItemStatus {
    Created,
    Skipped,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemOutcome {
    pub member_id: i32,
    pub status: BatchItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disbursement_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateResult {
    pub created: u32,
    pub skipped: u32,
    pub errored: u32,
    pub outcomes: Vec<BatchItemOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundDisbursementSummary {
    pub strike_fund_id: i32,
    pub pending_count: u32,
    pub pending_total: Decimal,
    pub approved_count: u32,
    pub approved_total: Decimal,
    pub paid_count: u32,
    pub paid_total: Decimal,
    /// Distinct members with at least one disbursement.
    pub member_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberHistoryQuery {
    #[serde(default)]
    pub strike_fund_id: Option<i32>,
}
