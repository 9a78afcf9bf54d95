//! Payment processor collaborator.
//!
//! Opaque boundary for stipend payouts: the engine sends an amount and
//! recipient with an idempotency key and stores the processor-assigned
//! transaction id. Card-network capture happens on the other side.

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::error::EngineError;

#[derive(Clone)]
pub struct PaymentProcessorService {
    client: Client,
    base_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayoutRequest {
    amount: Decimal,
    currency: &'static str,
    recipient_member_id: i32,
    organization_id: String,
    idempotency_key: String,
    description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayoutResponse {
    transaction_id: String,
}

impl PaymentProcessorService {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client, base_url }
    }

    /// Send a stipend payout and return the processor transaction id.
    pub async fn disburse(
        &self,
        organization_id: &str,
        member_id: i32,
        amount: Decimal,
        description: String,
    ) -> Result<String, EngineError> {
        let request = PayoutRequest {
            amount,
            currency: "usd",
            recipient_member_id: member_id,
            organization_id: organization_id.to_string(),
            idempotency_key: Uuid::new_v4().to_string(),
            description,
        };

        let response = self
            .client
            .post(format!("{}/payouts", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::Collaborator(format!("payment processor: {}", e)))?;

        if !response.status().is_success() {
            return Err(EngineError::Collaborator(format!(
                "payment processor returned HTTP {}",
                response.status()
            )));
        }

        let payout: PayoutResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Collaborator(format!("payment processor: {}", e)))?;

        Ok(payout.transaction_id)
    }
}
