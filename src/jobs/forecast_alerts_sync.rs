use sea_orm::DatabaseConnection;
use serde_json::json;
use tokio::time::{interval, Duration};

use crate::error::EngineError;
use crate::jobs::{active_funds, organization_ids, SweepOutcome};
use crate::models::forecast::AlertSeverity;
use crate::services::forecasting;
use crate::services::notifications::{
    NotificationChannel, NotificationPriority, NotificationQueueService, NotificationRequest,
    NotificationType,
};

/// Depletion-alert sweep. Forecasts every active fund and pushes
/// critical/warning alerts to the organization's administrators.
pub async fn start_forecast_alerts_job(
    db: std::sync::Arc<DatabaseConnection>,
    notifications: NotificationQueueService,
) {
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(21600)); // Every 6 hours

        // Run immediately on startup
        tracing::info!("Running initial fund depletion alert sweep");
        if let Err(e) = sweep_all_organizations(&db, &notifications).await {
            tracing::error!("Failed depletion alert sweep on startup: {}", e);
        }

        loop {
            interval.tick().await;
            tracing::info!("Starting scheduled fund depletion alert sweep");

            if let Err(e) = sweep_all_organizations(&db, &notifications).await {
                tracing::error!("Failed depletion alert sweep: {}", e);
            }
        }
    });
}

async fn sweep_all_organizations(
    db: &DatabaseConnection,
    notifications: &NotificationQueueService,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    for org_id in organization_ids(db).await? {
        match process_automated_alerts(db, notifications, &org_id).await {
            Ok(outcome) => {
                if outcome.notifications_sent > 0 {
                    tracing::info!(
                        "Depletion sweep for {}: {} funds checked, {} alerts sent",
                        org_id,
                        outcome.funds_checked,
                        outcome.notifications_sent
                    );
                }
            }
            Err(e) => {
                tracing::error!("Depletion alert sweep failed for {}: {}", org_id, e);
            }
        }
    }

    Ok(())
}

/// Forecast each active fund and enqueue a notification per actionable
/// alert. Also callable from the manual trigger endpoint.
pub async fn process_automated_alerts(
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

        for alert in &forecast.alerts {
            let priority = match alert.severity {
                AlertSeverity::Critical => NotificationPriority::Urgent,
                AlertSeverity::Warning => NotificationPriority::High,
                AlertSeverity::Info => continue, // informational, not worth a push
            };

            notifications
                .enqueue(NotificationRequest {
                    organization_id: organization_id.to_string(),
                    user_id: None,
                    notification_type: NotificationType::FundDepletionAlert,
                    channels: vec![NotificationChannel::Email, NotificationChannel::InApp],
                    priority,
                    data: json!({
                        "strikeFundId": fund.id,
                        "fundName": fund.name,
                        "severity": alert.severity,
                        "message": alert.message,
                        "daysRemaining": alert.days_remaining,
                        "currentBalance": forecast.current_balance,
                    }),
                })
                .await;
            outcome.notifications_sent += 1;
        }
    }

    Ok(outcome)
}
