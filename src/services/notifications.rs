//! Notification queue collaborator.
//!
//! The engine decides *that* and *what* to notify; transport (email,
//! SMS, push) belongs to the notification service behind this client.
//! Enqueueing is fire-and-forget: failures are logged, never propagated
//! into the caller's result.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone)]
pub struct NotificationQueueService {
    client: Client,
    queue_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub organization_id: String,
    /// None targets the organization's administrators.
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub channels: Vec<NotificationChannel>,
    pub priority: NotificationPriority,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    FundDepletionAlert,
    WeeklyForecastReport,
    ArrearsEscalation,
    StipendApproved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
    Push,
    InApp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl NotificationQueueService {
    pub fn new(queue_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, queue_url }
    }

    /// Enqueue a notification. Errors are logged and swallowed; the
    /// next scheduled run is the retry.
    pub async fn enqueue(&self, request: NotificationRequest) {
        let result = self
            .client
            .post(format!("{}/notifications", self.queue_url))
            .json(&request)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(
                    "Queued {:?} notification for {}",
                    request.notification_type,
                    request.organization_id
                );
            }
            Ok(response) => {
                tracing::error!(
                    "Notification queue rejected {:?} for {}: HTTP {}",
                    request.notification_type,
                    request.organization_id,
                    response.status()
                );
            }
            Err(e) => {
                tracing::error!(
                    "Failed to reach notification queue for {}: {}",
                    request.organization_id,
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_with_camel_case_and_type_tag() {
        let request = NotificationRequest {
            organization_id: "org_123".to_string(),
            user_id: None,
            notification_type: NotificationType::FundDepletionAlert,
            channels: vec![NotificationChannel::Email, NotificationChannel::InApp],
            priority: NotificationPriority::Urgent,
            data: serde_json::json!({ "fundId": 7 }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["organizationId"], "org_123");
        assert_eq!(json["type"], "fund_depletion_alert");
        assert_eq!(json["channels"][1], "in_app");
        assert_eq!(json["priority"], "urgent");
    }
}
