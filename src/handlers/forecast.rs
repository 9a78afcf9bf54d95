use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::AppState;
use crate::handlers::error_response;
use crate::jobs::{forecast_alerts_sync, weekly_report_sync};
use crate::models::common::ErrorResponse;
use crate::models::forecast::{
    BurnRateForecast, DailyCashFlow, ForecastQuery, MonthlyPattern, SeriesQuery,
};
use crate::services::forecasting;

pub async fn get_forecast(
    State(state): State<AppState>,
    Path((org_id, fund_id)): Path<(String, i32)>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<BurnRateForecast>, (StatusCode, Json<ErrorResponse>)> {
    let days = params.days.unwrap_or(forecasting::DEFAULT_FORECAST_DAYS);
    let forecast = forecasting::generate_forecast(&state.db, &org_id, fund_id, days)
        .await
        .map_err(error_response)?;
    Ok(Json(forecast))
}

pub async fn get_history(
    State(state): State<AppState>,
    Path((org_id, fund_id)): Path<(String, i32)>,
    Query(params): Query<SeriesQuery>,
) -> Result<Json<Vec<DailyCashFlow>>, (StatusCode, Json<ErrorResponse>)> {
    let series = forecasting::get_historical_burn_rate(
        &state.db,
        &org_id,
        fund_id,
        params.start_date,
        params.end_date,
    )
    .await
    .map_err(error_response)?;
    Ok(Json(series))
}

pub async fn get_seasonal(
    State(state): State<AppState>,
    Path((org_id, fund_id)): Path<(String, i32)>,
) -> Result<Json<Vec<MonthlyPattern>>, (StatusCode, Json<ErrorResponse>)> {
    let patterns = forecasting::detect_seasonal_patterns(&state.db, &org_id, fund_id)
        .await
        .map_err(error_response)?;
    Ok(Json(patterns))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub funds_checked: u32,
    pub notifications_sent: u32,
}

/// Manually trigger the depletion-alert sweep for one organization.
pub async fn run_alerts(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<Json<RunResponse>, (StatusCode, Json<ErrorResponse>)> {
    let outcome =
        forecast_alerts_sync::process_automated_alerts(&state.db, &state.notifications, &org_id)
            .await
            .map_err(error_response)?;
    Ok(Json(RunResponse {
        funds_checked: outcome.funds_checked,
        notifications_sent: outcome.notifications_sent,
    }))
}

/// Manually trigger the weekly forecast report for one organization.
pub async fn run_weekly_report(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<Json<RunResponse>, (StatusCode, Json<ErrorResponse>)> {
    let outcome = weekly_report_sync::generate_weekly_forecast_report(
        &state.db,
        &state.notifications,
        &org_id,
    )
    .await
    .map_err(error_response)?;
    Ok(Json(RunResponse {
        funds_checked: outcome.funds_checked,
        notifications_sent: outcome.notifications_sent,
    }))
}
