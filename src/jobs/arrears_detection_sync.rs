use sea_orm::DatabaseConnection;
use tokio::time::{interval, Duration};

use crate::jobs::organization_ids;
use crate::models::arrears::DetectionConfig;
use crate::services::arrears;

/// Daily arrears sweep. Walks every organization and runs detection
/// with the environment-derived config (14-day grace by default, no
/// late fees); fee policies are applied through the manual run endpoint
/// where an operator sets them explicitly.
pub async fn start_arrears_detection_job(db: std::sync::Arc<DatabaseConnection>) {
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(86400)); // Every 24 hours
        let config = config_from_env();

        // Run immediately on startup
        tracing::info!("Running initial arrears detection sweep");
        if let Err(e) = sweep_all_organizations(&db, &config).await {
            tracing::error!("Failed arrears sweep on startup: {}", e);
        }

        loop {
            interval.tick().await;
            tracing::info!("Starting scheduled arrears detection sweep");

            if let Err(e) = sweep_all_organizations(&db, &config).await {
                tracing::error!("Failed arrears sweep: {}", e);
            }
        }
    });
}

/// ARREARS_GRACE_PERIOD_DAYS and ARREARS_ESCALATION_DAYS ("30,60,90,120")
/// override the defaults for the scheduled sweep.
fn config_from_env() -> DetectionConfig {
    let mut config = DetectionConfig::default();

    if let Ok(grace) = std::env::var("ARREARS_GRACE_PERIOD_DAYS") {
        match grace.parse::<i64>() {
            Ok(days) if days >= 0 => config.grace_period_days = days,
            _ => tracing::warn!("Ignoring invalid ARREARS_GRACE_PERIOD_DAYS: {}", grace),
        }
    }

    if let Ok(raw) = std::env::var("ARREARS_ESCALATION_DAYS") {
        let parsed: Vec<i64> = raw
            .split(',')
            .filter_map(|part| part.trim().parse().ok())
            .collect();
        match <[i64; 4]>::try_from(parsed) {
            Ok(days) => config.escalation_days = Some(days),
            Err(_) => {
                tracing::warn!(
                    "Ignoring ARREARS_ESCALATION_DAYS (expected 4 comma-separated day counts): {}",
                    raw
                );
            }
        }
    }

    config
}

async fn sweep_all_organizations(
    db: &DatabaseConnection,
    config: &DetectionConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    for org_id in organization_ids(db).await? {
        match arrears::run_detection(db, &org_id, config).await {
            Ok(report) => {
                if report.detected_count > 0 {
                    tracing::info!(
                        "Arrears sweep for {}: {} members in arrears, {} cases created, {} updated",
                        org_id,
                        report.detected_count,
                        report.cases_created,
                        report.cases_updated
                    );
                }
            }
            Err(e) => {
                // One bad tenant must not stop the sweep.
                tracing::error!("Arrears detection failed for {}: {}", org_id, e);
            }
        }
    }

    Ok(())
}
