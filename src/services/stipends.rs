//! Stipend eligibility and the disbursement approval pipeline.
//!
//! Eligibility aggregates closed picket shifts into weekly hours per
//! member; disbursements then move strictly forward through
//! pending -> approved -> paid. Transitions are conditional updates
//! filtered on the expected current status so concurrent writers cannot
//! skip a state.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    Order, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::{HashMap, HashSet};

use crate::entities::{
    fund_transactions, prelude::*, stipend_disbursements, strike_funds,
};
use crate::error::EngineError;
use crate::models::stipend::{
    BatchCreateResult, BatchItemOutcome, BatchItemStatus, CreateDisbursementRequest,
    FundDisbursementSummary, StipendEligibility,
};
use crate::services::attendance;

use fund_transactions::FundTransactionType;
use stipend_disbursements::DisbursementStatus;

/// Eligibility policy resolved from fund configuration with global defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct StipendPolicy {
    pub minimum_hours: Decimal,
    pub hourly_rate: Decimal,
}

impl Default for StipendPolicy {
    fn default() -> Self {
        Self {
            minimum_hours: Decimal::from(20),
            hourly_rate: Decimal::from(15),
        }
    }
}

/// Derive the policy for a fund: the hourly rate is the weekly stipend
/// budget spread over the minimum-hours threshold when both are set.
pub fn resolve_policy(fund: &strike_funds::Model) -> StipendPolicy {
    let defaults = StipendPolicy::default();
    let minimum_hours = fund.minimum_hours.unwrap_or(defaults.minimum_hours);
    let hourly_rate = match (fund.weekly_stipend_amount, fund.minimum_hours) {
        (Some(weekly), Some(min_hours)) if min_hours > Decimal::ZERO => weekly / min_hours,
        _ => defaults.hourly_rate,
    };
    StipendPolicy {
        minimum_hours,
        hourly_rate,
    }
}

/// Pure eligibility decision for one member's weekly hours.
pub fn evaluate_member(member_id: i32, total_hours: Decimal, policy: &StipendPolicy) -> StipendEligibility {
    if total_hours >= policy.minimum_hours {
        StipendEligibility {
            member_id,
            total_hours,
            eligible: true,
            stipend_amount: (total_hours * policy.hourly_rate).round_dp(2),
            reason: None,
        }
    } else {
        StipendEligibility {
            member_id,
            total_hours,
            eligible: false,
            stipend_amount: Decimal::ZERO,
            reason: Some(format!(
                "worked {} of the required {} hours this week",
                total_hours, policy.minimum_hours
            )),
        }
    }
}

/// Status a disbursement must currently hold before moving to `target`.
pub fn required_current_status(target: DisbursementStatus) -> Option<DisbursementStatus> {
    match target {
        DisbursementStatus::Pending => None,
        DisbursementStatus::Approved => Some(DisbursementStatus::Pending),
        DisbursementStatus::Paid => Some(DisbursementStatus::Approved),
    }
}

/// Compute eligibility for every member with closed shifts in the week.
pub async fn calculate_eligibility(
    db: &DatabaseConnection,
    organization_id: &str,
    strike_fund_id: i32,
    week_start: NaiveDate,
    week_end: NaiveDate,
) -> Result<Vec<StipendEligibility>, EngineError> {
    if week_end < week_start {
        return Err(EngineError::Validation(
            "weekEndDate must not be before weekStartDate".to_string(),
        ));
    }

    let fund = find_fund(db, organization_id, strike_fund_id).await?;
    let policy = resolve_policy(&fund);

    let range_start = week_start
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc();
    let range_end = week_end
        .and_hms_opt(23, 59, 59)
        .unwrap_or_default()
        .and_utc();

    let shifts = attendance::get_history(
        db,
        organization_id,
        strike_fund_id,
        range_start,
        range_end,
        None,
    )
    .await?;

    let mut hours_by_member: HashMap<i32, Decimal> = HashMap::new();
    for shift in &shifts {
        if shift.check_out_time.is_none() {
            continue;
        }
        *hours_by_member.entry(shift.member_id).or_default() +=
            shift.hours_worked.unwrap_or(Decimal::ZERO);
    }

    let mut eligibility: Vec<StipendEligibility> = hours_by_member
        .into_iter()
        .map(|(member_id, hours)| evaluate_member(member_id, hours, &policy))
        .collect();
    eligibility.sort_by_key(|e| e.member_id);

    tracing::debug!(
        "Eligibility for fund {} week {}: {} members, {} eligible",
        strike_fund_id,
        week_start,
        eligibility.len(),
        eligibility.iter().filter(|e| e.eligible).count()
    );

    Ok(eligibility)
}

/// Insert one pending disbursement.
pub async fn create_disbursement(
    db: &DatabaseConnection,
    organization_id: &str,
    request: &CreateDisbursementRequest,
) -> Result<stipend_disbursements::Model, EngineError> {
    if request.amount <= Decimal::ZERO {
        return Err(EngineError::Validation(
            "disbursement amount must be positive".to_string(),
        ));
    }
    find_fund(db, organization_id, request.strike_fund_id).await?;

    let now = Utc::now();
    let disbursement = stipend_disbursements::ActiveModel {
        organization_id: Set(organization_id.to_string()),
        strike_fund_id: Set(request.strike_fund_id),
        member_id: Set(request.member_id),
        amount: Set(request.amount.round_dp(2)),
        week_start_date: Set(request.week_start_date),
        week_end_date: Set(request.week_end_date),
        status: Set(DisbursementStatus::Pending),
        payment_method: Set(request.payment_method.clone()),
        notes: Set(request.notes.clone()),
        created_at: Set(Some(now.into())),
        updated_at: Set(Some(now.into())),
        ..Default::default()
    };

    Ok(disbursement.insert(db).await?)
}

/// pending -> approved.
pub async fn approve(
    db: &DatabaseConnection,
    organization_id: &str,
    disbursement_id: i32,
    approved_by: &str,
) -> Result<stipend_disbursements::Model, EngineError> {
    transition(
        db,
        organization_id,
        disbursement_id,
        DisbursementStatus::Approved,
        |active| {
            active.approved_by = Set(Some(approved_by.to_string()));
        },
    )
    .await
}

/// approved -> paid, recording the payment processor transaction id.
/// Also books the cash outflow in the fund ledger so the forecaster
/// sees it, and draws down the fund balance. The status flip, the
/// ledger entry, and the balance drawdown commit together or not at
/// all; a failure part-way through leaves the disbursement approved
/// and retryable.
pub async fn mark_paid(
    db: &DatabaseConnection,
    organization_id: &str,
    disbursement_id: i32,
    transaction_id: &str,
) -> Result<stipend_disbursements::Model, EngineError> {
    let txn = db.begin().await?;

    let paid = transition(
        &txn,
        organization_id,
        disbursement_id,
        DisbursementStatus::Paid,
        |active| {
            active.transaction_id = Set(Some(transaction_id.to_string()));
        },
    )
    .await?;

    let now = Utc::now();
    let outflow = fund_transactions::ActiveModel {
        organization_id: Set(organization_id.to_string()),
        strike_fund_id: Set(paid.strike_fund_id),
        transaction_type: Set(FundTransactionType::StipendPayment),
        amount: Set(paid.amount),
        member_id: Set(Some(paid.member_id)),
        description: Set(Some(format!("stipend disbursement {}", paid.id))),
        occurred_at: Set(now.into()),
        created_at: Set(Some(now.into())),
        ..Default::default()
    };
    outflow.insert(&txn).await?;

    StrikeFunds::update_many()
        .col_expr(
            strike_funds::Column::CurrentBalance,
            Expr::col(strike_funds::Column::CurrentBalance).sub(paid.amount),
        )
        .col_expr(
            strike_funds::Column::UpdatedAt,
            Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(now)),
        )
        .filter(strike_funds::Column::Id.eq(paid.strike_fund_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        "Disbursement {} paid (${}, processor tx {})",
        paid.id,
        paid.amount,
        transaction_id
    );

    Ok(paid)
}

/// Conditional forward transition. The status filter makes the update a
/// compare-and-set: zero rows affected means someone else moved first,
/// and the error reports the actual current status.
async fn transition<C: ConnectionTrait>(
    db: &C,
    organization_id: &str,
    disbursement_id: i32,
    target: DisbursementStatus,
    mutate: impl FnOnce(&mut stipend_disbursements::ActiveModel),
) -> Result<stipend_disbursements::Model, EngineError> {
    let expected = required_current_status(target).ok_or_else(|| {
        EngineError::Validation("pending is the initial status, not a transition".to_string())
    })?;

    let current = StipendDisbursements::find_by_id(disbursement_id)
        .filter(stipend_disbursements::Column::OrganizationId.eq(organization_id))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound {
            entity: "disbursement",
            id: disbursement_id.to_string(),
        })?;

    if current.status != expected {
        return Err(EngineError::StateConflict {
            expected: match expected {
                DisbursementStatus::Pending => "pending",
                DisbursementStatus::Approved => "approved",
                DisbursementStatus::Paid => "paid",
            },
            actual: current.status.to_value(),
        });
    }

    let mut active: stipend_disbursements::ActiveModel = current.into();
    active.status = Set(target);
    active.updated_at = Set(Some(Utc::now().into()));
    mutate(&mut active);

    // Re-assert the expected status in the WHERE clause so a racing
    // writer between our read and this update loses cleanly.
    let updated = StipendDisbursements::update_many()
        .set(active)
        .filter(stipend_disbursements::Column::Id.eq(disbursement_id))
        .filter(stipend_disbursements::Column::Status.eq(expected))
        .exec_with_returning(db)
        .await?;

    match updated.into_iter().next() {
        Some(model) => Ok(model),
        None => {
            let actual = StipendDisbursements::find_by_id(disbursement_id)
                .one(db)
                .await?
                .map(|m| m.status.to_value())
                .unwrap_or_else(|| "deleted".to_string());
            Err(EngineError::StateConflict {
                expected: match expected {
                    DisbursementStatus::Pending => "pending",
                    DisbursementStatus::Approved => "approved",
                    DisbursementStatus::Paid => "paid",
                },
                actual,
            })
        }
    }
}

/// Run eligibility for the week and create one pending disbursement per
/// eligible member. Partial failure is normal: per-member outcomes are
/// collected and the batch never aborts.
pub async fn batch_create(
    db: &DatabaseConnection,
    organization_id: &str,
    strike_fund_id: i32,
    week_start: NaiveDate,
    week_end: NaiveDate,
) -> Result<BatchCreateResult, EngineError> {
    let eligibility =
        calculate_eligibility(db, organization_id, strike_fund_id, week_start, week_end).await?;

    let existing: HashSet<i32> = StipendDisbursements::find()
        .filter(stipend_disbursements::Column::OrganizationId.eq(organization_id))
        .filter(stipend_disbursements::Column::StrikeFundId.eq(strike_fund_id))
        .filter(stipend_disbursements::Column::WeekStartDate.eq(week_start))
        .all(db)
        .await?
        .into_iter()
        .map(|d| d.member_id)
        .collect();

    let mut outcomes = Vec::new();
    let mut created = 0;
    let mut skipped = 0;
    let mut errored = 0;

    for entry in &eligibility {
        if !entry.eligible {
            skipped += 1;
            outcomes.push(BatchItemOutcome {
                member_id: entry.member_id,
                status: BatchItemStatus::Skipped,
                disbursement_id: None,
                detail: entry.reason.clone(),
            });
            continue;
        }
        if existing.contains(&entry.member_id) {
            skipped += 1;
            outcomes.push(BatchItemOutcome {
                member_id: entry.member_id,
                status: BatchItemStatus::Skipped,
                disbursement_id: None,
                detail: Some("disbursement already exists for this week".to_string()),
            });
            continue;
        }

        let request = CreateDisbursementRequest {
            strike_fund_id,
            member_id: entry.member_id,
            amount: entry.stipend_amount,
            week_start_date: week_start,
            week_end_date: week_end,
            payment_method: None,
            notes: None,
        };

        match create_disbursement(db, organization_id, &request).await {
            Ok(model) => {
                created += 1;
                outcomes.push(BatchItemOutcome {
                    member_id: entry.member_id,
                    status: BatchItemStatus::Created,
                    disbursement_id: Some(model.id),
                    detail: None,
                });
            }
            Err(e) => {
                errored += 1;
                tracing::error!(
                    "Failed to create disbursement for member {} on fund {}: {}",
                    entry.member_id,
                    strike_fund_id,
                    e
                );
                outcomes.push(BatchItemOutcome {
                    member_id: entry.member_id,
                    status: BatchItemStatus::Error,
                    disbursement_id: None,
                    detail: Some(e.to_string()),
                });
            }
        }
    }

    Ok(BatchCreateResult {
        created,
        skipped,
        errored,
        outcomes,
    })
}

pub async fn get_disbursement(
    db: &DatabaseConnection,
    organization_id: &str,
    disbursement_id: i32,
) -> Result<stipend_disbursements::Model, EngineError> {
    StipendDisbursements::find_by_id(disbursement_id)
        .filter(stipend_disbursements::Column::OrganizationId.eq(organization_id))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound {
            entity: "disbursement",
            id: disbursement_id.to_string(),
        })
}

/// Pending disbursements for a fund, oldest first.
pub async fn get_pending(
    db: &DatabaseConnection,
    organization_id: &str,
    strike_fund_id: i32,
) -> Result<Vec<stipend_disbursements::Model>, EngineError> {
    let pending = StipendDisbursements::find()
        .filter(stipend_disbursements::Column::OrganizationId.eq(organization_id))
        .filter(stipend_disbursements::Column::StrikeFundId.eq(strike_fund_id))
        .filter(stipend_disbursements::Column::Status.eq(DisbursementStatus::Pending))
        .order_by(stipend_disbursements::Column::CreatedAt, Order::Asc)
        .all(db)
        .await?;
    Ok(pending)
}

/// A member's disbursement history, newest week first.
pub async fn get_member_history(
    db: &DatabaseConnection,
    organization_id: &str,
    member_id: i32,
    strike_fund_id: Option<i32>,
) -> Result<Vec<stipend_disbursements::Model>, EngineError> {
    let mut query = StipendDisbursements::find()
        .filter(stipend_disbursements::Column::OrganizationId.eq(organization_id))
        .filter(stipend_disbursements::Column::MemberId.eq(member_id));
    if let Some(fund_id) = strike_fund_id {
        query = query.filter(stipend_disbursements::Column::StrikeFundId.eq(fund_id));
    }
    let history = query
        .order_by(stipend_disbursements::Column::WeekStartDate, Order::Desc)
        .all(db)
        .await?;
    Ok(history)
}

/// Per-status totals plus distinct member count for dashboards.
pub async fn get_fund_summary(
    db: &DatabaseConnection,
    organization_id: &str,
    strike_fund_id: i32,
) -> Result<FundDisbursementSummary, EngineError> {
    let disbursements = StipendDisbursements::find()
        .filter(stipend_disbursements::Column::OrganizationId.eq(organization_id))
        .filter(stipend_disbursements::Column::StrikeFundId.eq(strike_fund_id))
        .all(db)
        .await?;
    Ok(summarize_disbursements(strike_fund_id, &disbursements))
}

/// Fold disbursement rows into the dashboard summary.
pub fn summarize_disbursements(
    strike_fund_id: i32,
    disbursements: &[stipend_disbursements::Model],
) -> FundDisbursementSummary {
    let mut summary = FundDisbursementSummary {
        strike_fund_id,
        pending_count: 0,
        pending_total: Decimal::ZERO,
        approved_count: 0,
        approved_total: Decimal::ZERO,
        paid_count: 0,
        paid_total: Decimal::ZERO,
        member_count: 0,
    };
    let mut members = HashSet::new();

    for d in disbursements {
        members.insert(d.member_id);
        match d.status {
            DisbursementStatus::Pending => {
                summary.pending_count += 1;
                summary.pending_total += d.amount;
            }
            DisbursementStatus::Approved => {
                summary.approved_count += 1;
                summary.approved_total += d.amount;
            }
            DisbursementStatus::Paid => {
                summary.paid_count += 1;
                summary.paid_total += d.amount;
            }
        }
    }

    summary.member_count = members.len() as u32;
    summary
}

async fn find_fund(
    db: &DatabaseConnection,
    organization_id: &str,
    strike_fund_id: i32,
) -> Result<strike_funds::Model, EngineError> {
    StrikeFunds::find_by_id(strike_fund_id)
        .filter(strike_funds::Column::OrganizationId.eq(organization_id))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound {
            entity: "strike fund",
            id: strike_fund_id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn fund_with(
        weekly_stipend: Option<Decimal>,
        minimum_hours: Option<Decimal>,
    ) -> strike_funds::Model {
        strike_funds::Model {
            id: 1,
            organization_id: "org_test".to_string(),
            name: "Local 100 Strike Fund".to_string(),
            status: strike_funds::FundStatus::Active,
            current_balance: dec!(10000),
            target_balance: None,
            weekly_stipend_amount: weekly_stipend,
            minimum_hours,
            picket_latitude: None,
            picket_longitude: None,
            checkin_radius_meters: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn disbursement(member_id: i32, amount: Decimal, status: DisbursementStatus) -> stipend_disbursements::Model {
        stipend_disbursements::Model {
            id: 0,
            organization_id: "org_test".to_string(),
            strike_fund_id: 1,
            member_id,
            amount,
            week_start_date: NaiveDate::from_ymd_opt(2026, 8, 3).unwrap(),
            week_end_date: NaiveDate::from_ymd_opt(2026, 8, 9).unwrap(),
            status,
            payment_method: None,
            approved_by: None,
            transaction_id: None,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn policy_derives_rate_from_fund_config() {
        // $300/week over 20 hours = $15/hour
        let fund = fund_with(Some(dec!(300)), Some(dec!(20)));
        let policy = resolve_policy(&fund);
        assert_eq!(policy.minimum_hours, dec!(20));
        assert_eq!(policy.hourly_rate, dec!(15));
    }

    #[test]
    fn policy_falls_back_to_defaults() {
        let fund = fund_with(None, None);
        let policy = resolve_policy(&fund);
        assert_eq!(policy, StipendPolicy::default());
    }

    #[test]
    fn member_over_threshold_gets_stipend() {
        // 25 hours at the 20h/$300 fund: eligible, 25 * 15 = $375
        let policy = resolve_policy(&fund_with(Some(dec!(300)), Some(dec!(20))));
        let result = evaluate_member(1, dec!(25), &policy);
        assert!(result.eligible);
        assert_eq!(result.stipend_amount, dec!(375.00));
        assert!(result.reason.is_none());
    }

    #[test]
    fn member_under_threshold_gets_zero_with_reason() {
        let policy = StipendPolicy::default();
        let result = evaluate_member(1, dec!(12.5), &policy);
        assert!(!result.eligible);
        assert_eq!(result.stipend_amount, Decimal::ZERO);
        assert!(result.reason.as_deref().unwrap().contains("12.5"));
    }

    #[test]
    fn stipend_amount_is_monotone_in_hours() {
        let policy = StipendPolicy::default();
        let mut previous = Decimal::ZERO;
        for h in 0..60 {
            let amount = evaluate_member(1, Decimal::from(h), &policy).stipend_amount;
            assert!(amount >= previous, "amount decreased at {} hours", h);
            previous = amount;
        }
    }

    #[test]
    fn transition_table_is_forward_only() {
        assert_eq!(required_current_status(DisbursementStatus::Pending), None);
        assert_eq!(
            required_current_status(DisbursementStatus::Approved),
            Some(DisbursementStatus::Pending)
        );
        assert_eq!(
            required_current_status(DisbursementStatus::Paid),
            Some(DisbursementStatus::Approved)
        );
    }

    #[test]
    fn summary_groups_by_status_and_counts_members() {
        let rows = vec![
            disbursement(1, dec!(300), DisbursementStatus::Pending),
            disbursement(2, dec!(450), DisbursementStatus::Approved),
            disbursement(1, dec!(300), DisbursementStatus::Paid),
            disbursement(3, dec!(150), DisbursementStatus::Paid),
        ];
        let summary = summarize_disbursements(1, &rows);
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.pending_total, dec!(300));
        assert_eq!(summary.approved_count, 1);
        assert_eq!(summary.paid_count, 2);
        assert_eq!(summary.paid_total, dec!(450));
        assert_eq!(summary.member_count, 3);
    }

    #[tokio::test]
    async fn mark_paid_books_ledger_and_balance_in_one_transaction() {
        use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

        let approved = disbursement(1, dec!(375), DisbursementStatus::Approved);
        let mut paid = approved.clone();
        paid.status = DisbursementStatus::Paid;
        paid.transaction_id = Some("proc_tx_1".to_string());

        let outflow = fund_transactions::Model {
            id: 1,
            organization_id: "org_test".to_string(),
            strike_fund_id: 1,
            transaction_type: FundTransactionType::StipendPayment,
            amount: dec!(375),
            member_id: Some(1),
            description: Some("stipend disbursement 0".to_string()),
            occurred_at: Utc::now().into(),
            created_at: None,
        };

        // lookup, conditional update, ledger insert, balance drawdown
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![approved]])
            .append_query_results([vec![paid.clone()]])
            .append_query_results([vec![outflow]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let result = mark_paid(&db, "org_test", 0, "proc_tx_1").await.unwrap();
        assert_eq!(result.status, DisbursementStatus::Paid);
        assert_eq!(result.transaction_id.as_deref(), Some("proc_tx_1"));

        // One transaction log entry means every statement ran between a
        // single BEGIN and COMMIT; a partial failure rolls all of it back.
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
        let rendered = format!("{:?}", log[0]);
        assert!(rendered.contains("fund_transactions"));
        assert!(rendered.contains("strike_funds"));
    }

    #[tokio::test]
    async fn mark_paid_on_already_paid_disbursement_is_a_conflict() {
        use sea_orm::{DatabaseBackend, MockDatabase};

        let mut already_paid = disbursement(1, dec!(375), DisbursementStatus::Paid);
        already_paid.transaction_id = Some("proc_tx_1".to_string());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![already_paid]])
            .into_connection();

        let err = mark_paid(&db, "org_test", 0, "proc_tx_2").await.unwrap_err();
        assert!(matches!(err, EngineError::StateConflict { expected: "approved", .. }));
    }
}
