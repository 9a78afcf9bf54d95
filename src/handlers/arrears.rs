use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use rust_decimal::Decimal;

use crate::AppState;
use crate::entities::arrears_cases::{self, ContactLogEntry};
use crate::error::EngineError;
use crate::handlers::error_response;
use crate::models::arrears::{
    CaseFilters, CreateCaseRequest, CreatePaymentPlanRequest, DetectionConfig, DetectionReport,
    LogContactRequest, MemberArrears, RecordPaymentRequest, UpdateStatusRequest,
};
use crate::models::common::ErrorResponse;
use crate::services::arrears::{self, EscalationThresholds};
use crate::services::notifications::{
    NotificationChannel, NotificationPriority, NotificationRequest, NotificationType,
};

/// Dry run: report who is in arrears without touching any case.
pub async fn detect(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(config): Json<DetectionConfig>,
) -> Result<Json<Vec<MemberArrears>>, (StatusCode, Json<ErrorResponse>)> {
    let detected = arrears::detect(&state.db, &org_id, &config)
        .await
        .map_err(error_response)?;
    Ok(Json(detected))
}

pub async fn run_detection(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(config): Json<DetectionConfig>,
) -> Result<Json<DetectionReport>, (StatusCode, Json<ErrorResponse>)> {
    let report = arrears::run_detection(&state.db, &org_id, &config)
        .await
        .map_err(error_response)?;

    if report.detected_count > 0 {
        state
            .notifications
            .enqueue(NotificationRequest {
                organization_id: org_id,
                user_id: None,
                notification_type: NotificationType::ArrearsEscalation,
                channels: vec![NotificationChannel::Email, NotificationChannel::InApp],
                priority: NotificationPriority::High,
                data: json!({
                    "detectedCount": report.detected_count,
                    "casesCreated": report.cases_created,
                    "casesUpdated": report.cases_updated,
                    "totalOwing": report.total_owing,
                }),
            })
            .await;
    }

    Ok(Json(report))
}

pub async fn list_cases(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Query(filters): Query<CaseFilters>,
) -> Result<Json<Vec<arrears_cases::Model>>, (StatusCode, Json<ErrorResponse>)> {
    let cases = arrears::list_cases(&state.db, &org_id, &filters)
        .await
        .map_err(error_response)?;
    Ok(Json(cases))
}

/// Manually open a case, e.g. for debt a coordinator negotiated outside
/// the dues ledger. Conflicts if the member already has an open case.
pub async fn create_case(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(payload): Json<CreateCaseRequest>,
) -> Result<(StatusCode, Json<arrears_cases::Model>), (StatusCode, Json<ErrorResponse>)> {
    if payload.total_owing <= Decimal::ZERO {
        return Err(error_response(EngineError::Validation(
            "totalOwing must be positive".to_string(),
        )));
    }

    let member =
        payload.into_member_arrears(Utc::now().date_naive(), &EscalationThresholds::default());
    let case = arrears::create_case(&state.db, &org_id, &member)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(case)))
}

pub async fn get_case(
    State(state): State<AppState>,
    Path((org_id, case_id)): Path<(String, i32)>,
) -> Result<Json<arrears_cases::Model>, (StatusCode, Json<ErrorResponse>)> {
    let case = arrears::get_case(&state.db, &org_id, case_id)
        .await
        .map_err(error_response)?;
    Ok(Json(case))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path((org_id, case_id)): Path<(String, i32)>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<arrears_cases::Model>, (StatusCode, Json<ErrorResponse>)> {
    let case = arrears::update_status(&state.db, &org_id, case_id, payload.status, payload.notes)
        .await
        .map_err(error_response)?;
    Ok(Json(case))
}

pub async fn create_payment_plan(
    State(state): State<AppState>,
    Path((org_id, case_id)): Path<(String, i32)>,
    Json(payload): Json<CreatePaymentPlanRequest>,
) -> Result<Json<arrears_cases::Model>, (StatusCode, Json<ErrorResponse>)> {
    let case = arrears::create_payment_plan(&state.db, &org_id, case_id, &payload)
        .await
        .map_err(error_response)?;
    Ok(Json(case))
}

pub async fn log_contact(
    State(state): State<AppState>,
    Path((org_id, case_id)): Path<(String, i32)>,
    Json(payload): Json<LogContactRequest>,
) -> Result<Json<arrears_cases::Model>, (StatusCode, Json<ErrorResponse>)> {
    let entry = ContactLogEntry {
        schema_version: 1,
        timestamp: Utc::now().into(),
        contact_type: payload.contact_type,
        notes: payload.notes,
        outcome: payload.outcome,
        performed_by: payload.performed_by,
    };
    let case = arrears::log_contact(&state.db, &org_id, case_id, entry)
        .await
        .map_err(error_response)?;
    Ok(Json(case))
}

pub async fn record_payment(
    State(state): State<AppState>,
    Path((org_id, case_id)): Path<(String, i32)>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<Json<arrears_cases::Model>, (StatusCode, Json<ErrorResponse>)> {
    let case = arrears::record_payment(&state.db, &org_id, case_id, payload.amount)
        .await
        .map_err(error_response)?;
    Ok(Json(case))
}
