use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::arrears_cases::{ArrearsStatus, ContactType, InstallmentFrequency};
use crate::services::arrears::EscalationThresholds;

/// Configuration for one detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    /// Days past the due date before a pending transaction counts as overdue.
    #[serde(default = "default_grace_period")]
    pub grace_period_days: i64,
    #[serde(default)]
    pub apply_late_fees: bool,
    /// Percentage of the base amount charged as a late fee.
    #[serde(default)]
    pub late_fee_percent: Decimal,
    /// Flat late fee added on top of the percentage.
    #[serde(default)]
    pub late_fee_fixed: Decimal,
    #[serde(default)]
    pub escalation_days: Option<[i64; 4]>,
}

fn default_grace_period() -> i64 {
    14
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            grace_period_days: default_grace_period(),
            apply_late_fees: false,
            late_fee_percent: Decimal::ZERO,
            late_fee_fixed: Decimal::ZERO,
            escalation_days: None,
        }
    }
}

impl DetectionConfig {
    pub fn thresholds(&self) -> EscalationThresholds {
        match self.escalation_days {
            Some([l1, l2, l3, l4]) => EscalationThresholds {
                level1_days: l1,
                level2_days: l2,
                level3_days: l3,
                level4_days: l4,
            },
            None => EscalationThresholds::default(),
        }
    }
}

/// One member's aggregated overdue position, as produced by detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberArrears {
    pub member_id: i32,
    pub transaction_ids: Vec<i32>,
    pub transaction_count: u32,
    pub total_owing: Decimal,
    pub oldest_debt_date: NaiveDate,
    pub days_overdue: i64,
    /// None while the debt is younger than the first escalation threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_escalation: Option<ArrearsStatus>,
}

/// Manually open a case outside a detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCaseRequest {
    pub member_id: i32,
    pub transaction_ids: Vec<i32>,
    pub total_owing: Decimal,
    pub oldest_debt_date: NaiveDate,
}

impl CreateCaseRequest {
    /// Expand into the per-member aggregate shape case creation works on.
    pub fn into_member_arrears(
        self,
        today: NaiveDate,
        thresholds: &EscalationThresholds,
    ) -> MemberArrears {
        let days_overdue = (today - self.oldest_debt_date).num_days().max(0);
        let mut transaction_ids = self.transaction_ids;
        transaction_ids.sort_unstable();
        transaction_ids.dedup();
        MemberArrears {
            member_id: self.member_id,
            transaction_count: transaction_ids.len() as u32,
            transaction_ids,
            total_owing: self.total_owing,
            oldest_debt_date: self.oldest_debt_date,
            days_overdue,
            suggested_escalation: thresholds.suggest(days_overdue),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub detected_count: u32,
    pub cases_created: u32,
    pub cases_updated: u32,
    pub total_owing: Decimal,
    pub fees_applied: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseFilters {
    #[serde(default)]
    pub status: Option<ArrearsStatus>,
    #[serde(default)]
    pub member_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentPlanRequest {
    pub installment_amount: Decimal,
    pub installment_count: u32,
    pub start_date: NaiveDate,
    pub frequency: InstallmentFrequency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: ArrearsStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogContactRequest {
    pub contact_type: ContactType,
    pub notes: String,
    #[serde(default)]
    pub outcome: Option<String>,
    pub performed_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
}
