use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::AppState;
use crate::entities::attendance_records;
use crate::error::EngineError;
use crate::handlers::error_response;
use crate::models::attendance::{
    CheckInRequest, CheckInResponse, CheckOutRequest, CheckOutResponse,
    CoordinatorOverrideRequest, DistanceRequest, DistanceResponse, HistoryQuery,
    MemberAttendanceSummary, TokenRequest, TokenResponse, ValidateTokenRequest,
    ValidateTokenResponse,
};
use crate::models::common::ErrorResponse;
use crate::services::{attendance, checkin_token, geo};

pub async fn check_in(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(payload): Json<CheckInRequest>,
) -> Result<Json<CheckInResponse>, (StatusCode, Json<ErrorResponse>)> {
    let outcome = attendance::check_in(&state.db, &org_id, &payload)
        .await
        .map_err(error_response)?;

    Ok(Json(CheckInResponse {
        attendance_id: outcome.attendance_id,
        location_verified: outcome.location_verified,
        distance_meters: outcome.distance_meters,
    }))
}

pub async fn check_out(
    State(state): State<AppState>,
    Path((org_id, attendance_id)): Path<(String, i32)>,
    Json(payload): Json<CheckOutRequest>,
) -> Result<Json<CheckOutResponse>, (StatusCode, Json<ErrorResponse>)> {
    let coordinates = match (payload.latitude, payload.longitude) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => None,
    };

    let outcome = attendance::check_out(&state.db, &org_id, attendance_id, coordinates)
        .await
        .map_err(error_response)?;

    Ok(Json(CheckOutResponse {
        attendance_id: outcome.attendance_id,
        hours_worked: outcome.hours_worked,
        already_checked_out: outcome.already_checked_out,
    }))
}

pub async fn coordinator_override(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(payload): Json<CoordinatorOverrideRequest>,
) -> Result<Json<attendance_records::Model>, (StatusCode, Json<ErrorResponse>)> {
    let record = attendance::coordinator_override(&state.db, &org_id, &payload)
        .await
        .map_err(error_response)?;
    Ok(Json(record))
}

pub async fn get_active(
    State(state): State<AppState>,
    Path((org_id, fund_id)): Path<(String, i32)>,
) -> Result<Json<Vec<attendance_records::Model>>, (StatusCode, Json<ErrorResponse>)> {
    let records = attendance::get_active_checkins(&state.db, &org_id, fund_id)
        .await
        .map_err(error_response)?;
    Ok(Json(records))
}

pub async fn get_history(
    State(state): State<AppState>,
    Path((org_id, fund_id)): Path<(String, i32)>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<attendance_records::Model>>, (StatusCode, Json<ErrorResponse>)> {
    let records = attendance::get_history(
        &state.db,
        &org_id,
        fund_id,
        params.start_date,
        params.end_date,
        params.member_id,
    )
    .await
    .map_err(error_response)?;
    Ok(Json(records))
}

pub async fn get_summary(
    State(state): State<AppState>,
    Path((org_id, fund_id)): Path<(String, i32)>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<MemberAttendanceSummary>>, (StatusCode, Json<ErrorResponse>)> {
    let summaries = attendance::get_member_summaries(
        &state.db,
        &org_id,
        fund_id,
        params.start_date,
        params.end_date,
        params.member_id,
    )
    .await
    .map_err(error_response)?;
    Ok(Json(summaries))
}

pub async fn generate_token(
    Path(_org_id): Path<String>,
    Json(payload): Json<TokenRequest>,
) -> Json<TokenResponse> {
    let token = checkin_token::generate_token(payload.strike_fund_id, payload.member_id, Utc::now());
    Json(TokenResponse {
        token,
        expires_in_secs: checkin_token::TOKEN_TTL_SECS,
    })
}

pub async fn validate_token(
    Path(_org_id): Path<String>,
    Json(payload): Json<ValidateTokenRequest>,
) -> Json<ValidateTokenResponse> {
    match checkin_token::validate_token(&payload.token, Utc::now()) {
        Ok(claims) => Json(ValidateTokenResponse {
            valid: true,
            strike_fund_id: Some(claims.fund_id),
            member_id: Some(claims.member_id),
            error: None,
        }),
        Err(e) => Json(ValidateTokenResponse {
            valid: false,
            strike_fund_id: None,
            member_id: None,
            error: Some(e.to_string()),
        }),
    }
}

pub async fn calculate_distance(
    Json(payload): Json<DistanceRequest>,
) -> Result<Json<DistanceResponse>, (StatusCode, Json<ErrorResponse>)> {
    for point in [payload.from, payload.to] {
        if !(-90.0..=90.0).contains(&point.latitude)
            || !(-180.0..=180.0).contains(&point.longitude)
        {
            return Err(error_response(EngineError::Validation(
                "coordinates out of range".to_string(),
            )));
        }
    }

    Ok(Json(DistanceResponse {
        distance_meters: geo::distance_between(payload.from, payload.to),
    }))
}
