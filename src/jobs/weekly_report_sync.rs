use sea_orm::DatabaseConnection;
use serde_json::json;
use tokio::time::{interval, Duration};

use crate::error::EngineError;
use crate::jobs::{active_funds, organization_ids, SweepOutcome};
use crate::services::forecasting;
use crate::services::notifications::{
    NotificationChannel, NotificationPriority, NotificationQueueService, NotificationRequest,
    NotificationType,
};

/// Weekly forecast digest: one report per active fund, sent to the
/// organization's administrators.
pub async fn start_weekly_report_job(
    db: std::sync::Arc<DatabaseConnection>,
    notifications: NotificationQueueService,
) {
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(604800)); // Every 7 days

        // Run immediately on startup
        tracing::info!("Running initial weekly forecast report");
        if let Err(e) = report_all_organizations(&db, &notifications).await {
            tracing::error!("Failed weekly forecast report on startup: {}", e);
        }

        loop {
            interval.tick().await;
            tracing::info!("Starting scheduled weekly forecast report");

            if let Err(e) = report_all_organizations(&db, &notifications).await {
                tracing::error!("Failed weekly forecast report: {}", e);
            }
        }
    });
}

async fn report_all_organizations(
    db: &DatabaseConnection,
    notifications: &NotificationQueueService,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    for org_id in organization_ids(db).await? {
        match generate_weekly_forecast_report(db, notifications, &org_id).await {
            Ok(outcome) => {
                tracing::info!(
                    "Weekly report for {}: {} funds, {} reports sent",
                    org_id,
                    outcome.funds_checked,
                    outcome.notifications_sent
                );
            }
            Err(e) => {
                tracing::error!("Weekly forecast report failed for {}: {}", org_id, e);
            }
        }
    }

    Ok(())
}

/// Build and enqueue the weekly digest for one organization. Also
/// callable from the manual trigger endpoint.
pub async fn generate_weekly_forecast_report(
    db: &DatabaseConnection,
    notifications: &NotificationQueueService,
    organization_id: &str,
) -> Result<SweepOutcome, EngineError> {
    let mut outcome = SweepOutcome::default();

    for fund in active_funds(db, organization_id).await? {
        outcome.funds_checked += 1;

        let forecast = match forecasting::generate_forecast(
            db,
            organization_id,
            fund.id,
            forecasting::DEFAULT_FORECAST_DAYS,
        )
        .await
        {
            Ok(forecast) => forecast,
            Err(e) => {
                tracing::error!("Forecast failed for fund {} ({}): {}", fund.id, fund.name, e);
                continue;
            }
        };

        notifications
            .enqueue(NotificationRequest {
                organization_id: organization_id.to_string(),
                user_id: None,
                notification_type: NotificationType::WeeklyForecastReport,
                channels: vec![NotificationChannel::Email],
                priority: NotificationPriority::Normal,
                data: json!({
                    "strikeFundId": fund.id,
                    "fundName": fund.name,
                    "currentBalance": forecast.current_balance,
                    "historicalBurnRate": forecast.historical_burn_rate,
                    "historicalDonationRate": forecast.historical_donation_rate,
                    "realisticDaysRemaining": forecast.scenarios.realistic.days_remaining,
                    "pessimisticDaysRemaining": forecast.scenarios.pessimistic.days_remaining,
                    "recommendations": forecast.recommendations,
                }),
            })
            .await;
        outcome.notifications_sent += 1;
    }

    Ok(outcome)
}
