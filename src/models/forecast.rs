use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One day of the historical cash-flow series. Monetary values are f64:
/// this is chart/projection math, not ledger arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCashFlow {
    pub date: NaiveDate,
    pub deposits: f64,
    pub withdrawals: f64,
    pub net_change: f64,
    /// Running net change from the window start.
    pub balance: f64,
    /// 7-day trailing average of withdrawals.
    pub run_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPattern {
    /// Calendar month, 0-11.
    pub month: u32,
    pub avg_burn_rate: f64,
    pub avg_donations: f64,
    pub variance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedPoint {
    pub date: NaiveDate,
    /// Floored at zero for display.
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastScenario {
    pub label: String,
    pub daily_burn: f64,
    pub daily_donations: f64,
    pub projected_balance: Vec<ProjectedPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depletion_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<u32>,
    pub confidence: f64,
    pub assumptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastScenarios {
    pub optimistic: ForecastScenario,
    pub realistic: ForecastScenario,
    pub pessimistic: ForecastScenario,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastAlert {
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<u32>,
}

/// Point-in-time projection for one fund. Derived, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnRateForecast {
    pub strike_fund_id: i32,
    pub generated_at: DateTime<Utc>,
    pub current_balance: f64,
    pub historical_burn_rate: f64,
    pub historical_donation_rate: f64,
    pub scenarios: ForecastScenarios,
    pub recommendations: Vec<String>,
    pub alerts: Vec<ForecastAlert>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastQuery {
    #[serde(default)]
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
