use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::AppState;
use crate::entities::stipend_disbursements;
use crate::handlers::error_response;
use crate::models::common::ErrorResponse;
use crate::models::stipend::{
    ApproveRequest, BatchCreateResult, CreateDisbursementRequest, FundDisbursementSummary,
    MarkPaidRequest, MemberHistoryQuery, StipendEligibility, WeekQuery,
};
use crate::services::notifications::{
    NotificationChannel, NotificationPriority, NotificationRequest, NotificationType,
};
use crate::services::stipends;

pub async fn calculate_eligibility(
    State(state): State<AppState>,
    Path((org_id, fund_id)): Path<(String, i32)>,
    Query(params): Query<WeekQuery>,
) -> Result<Json<Vec<StipendEligibility>>, (StatusCode, Json<ErrorResponse>)> {
    let eligibility = stipends::calculate_eligibility(
        &state.db,
        &org_id,
        fund_id,
        params.week_start_date,
        params.week_end_date,
    )
    .await
    .map_err(error_response)?;
    Ok(Json(eligibility))
}

pub async fn create_disbursement(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(payload): Json<CreateDisbursementRequest>,
) -> Result<(StatusCode, Json<stipend_disbursements::Model>), (StatusCode, Json<ErrorResponse>)> {
    let disbursement = stipends::create_disbursement(&state.db, &org_id, &payload)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(disbursement)))
}

pub async fn approve(
    State(state): State<AppState>,
    Path((org_id, disbursement_id)): Path<(String, i32)>,
    Json(payload): Json<ApproveRequest>,
) -> Result<Json<stipend_disbursements::Model>, (StatusCode, Json<ErrorResponse>)> {
    let approved = stipends::approve(&state.db, &org_id, disbursement_id, &payload.approved_by)
        .await
        .map_err(error_response)?;

    state
        .notifications
        .enqueue(NotificationRequest {
            organization_id: org_id,
            user_id: Some(approved.member_id.to_string()),
            notification_type: NotificationType::StipendApproved,
            channels: vec![NotificationChannel::Email, NotificationChannel::InApp],
            priority: NotificationPriority::Normal,
            data: json!({
                "disbursementId": approved.id,
                "amount": approved.amount,
                "weekStartDate": approved.week_start_date,
            }),
        })
        .await;

    Ok(Json(approved))
}

pub async fn mark_paid(
    State(state): State<AppState>,
    Path((org_id, disbursement_id)): Path<(String, i32)>,
    Json(payload): Json<MarkPaidRequest>,
) -> Result<Json<stipend_disbursements::Model>, (StatusCode, Json<ErrorResponse>)> {
    let transaction_id = match payload.transaction_id {
        Some(id) => id,
        None => {
            // No external reference supplied: run the payout through the
            // processor before recording it.
            let disbursement = stipends::get_disbursement(&state.db, &org_id, disbursement_id)
                .await
                .map_err(error_response)?;
            state
                .payments
                .disburse(
                    &org_id,
                    disbursement.member_id,
                    disbursement.amount,
                    format!(
                        "Strike stipend for week of {}",
                        disbursement.week_start_date
                    ),
                )
                .await
                .map_err(error_response)?
        }
    };

    let paid = stipends::mark_paid(&state.db, &org_id, disbursement_id, &transaction_id)
        .await
        .map_err(error_response)?;
    Ok(Json(paid))
}

pub async fn batch_create(
    State(state): State<AppState>,
    Path((org_id, fund_id)): Path<(String, i32)>,
    Query(params): Query<WeekQuery>,
) -> Result<Json<BatchCreateResult>, (StatusCode, Json<ErrorResponse>)> {
    let result = stipends::batch_create(
        &state.db,
        &org_id,
        fund_id,
        params.week_start_date,
        params.week_end_date,
    )
    .await
    .map_err(error_response)?;
    Ok(Json(result))
}

pub async fn get_pending(
    State(state): State<AppState>,
    Path((org_id, fund_id)): Path<(String, i32)>,
) -> Result<Json<Vec<stipend_disbursements::Model>>, (StatusCode, Json<ErrorResponse>)> {
    let pending = stipends::get_pending(&state.db, &org_id, fund_id)
        .await
        .map_err(error_response)?;
    Ok(Json(pending))
}

pub async fn get_member_history(
    State(state): State<AppState>,
    Path((org_id, member_id)): Path<(String, i32)>,
    Query(params): Query<MemberHistoryQuery>,
) -> Result<Json<Vec<stipend_disbursements::Model>>, (StatusCode, Json<ErrorResponse>)> {
    let history =
        stipends::get_member_history(&state.db, &org_id, member_id, params.strike_fund_id)
            .await
            .map_err(error_response)?;
    Ok(Json(history))
}

pub async fn get_fund_summary(
    State(state): State<AppState>,
    Path((org_id, fund_id)): Path<(String, i32)>,
) -> Result<Json<FundDisbursementSummary>, (StatusCode, Json<ErrorResponse>)> {
    let summary = stipends::get_fund_summary(&state.db, &org_id, fund_id)
        .await
        .map_err(error_response)?;
    Ok(Json(summary))
}
