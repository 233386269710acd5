//! PayPal Orders v2 client.
//!
//! Order state lives entirely at the gateway: create reserves a charge,
//! capture finalizes it. Capture is idempotent per order id on the gateway
//! side, which the registration workflow relies on.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::PaypalConfig;

/// The gateway's terminal-success status for a captured order.
pub const CAPTURE_COMPLETED: &str = "COMPLETED";

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway answered with a non-success status. The message is safe
    /// to surface to the client; the details are the gateway's raw body.
    #[error("{message}")]
    Rejected { message: String, details: Value },
    /// Network failure or timeout before a gateway answer arrived.
    #[error("payment gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct PaymentGateway {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    secret: String,
}

impl PaymentGateway {
    pub fn new(config: &PaypalConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            secret: config.secret.clone(),
        }
    }

    /// Reserve a charge. Returns the gateway's order object (the client
    /// widget needs its `id`).
    pub async fn create_order(
        &self,
        amount: &str,
        currency: &str,
        description: &str,
    ) -> Result<Value, GatewayError> {
        let body = serde_json::json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": {
                    "currency_code": currency,
                    "value": amount,
                },
                "description": description,
            }],
        });

        let response = self
            .client
            .post(format!("{}/v2/checkout/orders", self.base_url))
            .basic_auth(&self.client_id, Some(&self.secret))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let data: Value = response.json().await?;

        if !status.is_success() {
            return Err(rejected(&data, "PayPal order creation failed"));
        }
        Ok(data)
    }

    /// Finalize a previously approved order. The caller must still check the
    /// returned status is [`CAPTURE_COMPLETED`]; any other value means the
    /// funds did not move.
    pub async fn capture_order(&self, order_id: &str) -> Result<Value, GatewayError> {
        let response = self
            .client
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.base_url, order_id
            ))
            .basic_auth(&self.client_id, Some(&self.secret))
            .send()
            .await?;

        let status = response.status();
        let data: Value = response.json().await?;

        if !status.is_success() {
            return Err(rejected(&data, "Payment capture failed"));
        }
        Ok(data)
    }
}

/// Whether a capture response reached the terminal-success status.
pub fn capture_completed(capture: &Value) -> bool {
    capture.get("status").and_then(Value::as_str) == Some(CAPTURE_COMPLETED)
}

fn rejected(data: &Value, fallback: &str) -> GatewayError {
    let message = data
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string();
    GatewayError::Rejected {
        message,
        details: data.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_completed_exact_match_only() {
        assert!(capture_completed(
            &serde_json::json!({"id": "5O1", "status": "COMPLETED"})
        ));
        // Approved-but-not-captured and voided orders are failures.
        assert!(!capture_completed(&serde_json::json!({"status": "APPROVED"})));
        assert!(!capture_completed(&serde_json::json!({"status": "VOIDED"})));
        assert!(!capture_completed(&serde_json::json!({"status": "completed"})));
        assert!(!capture_completed(&serde_json::json!({"id": "5O1"})));
    }

    #[test]
    fn test_rejection_uses_gateway_message_when_present() {
        let err = rejected(
            &serde_json::json!({"message": "INSTRUMENT_DECLINED"}),
            "fallback",
        );
        assert_eq!(err.to_string(), "INSTRUMENT_DECLINED");

        let err = rejected(&serde_json::json!({"name": "oops"}), "fallback");
        assert_eq!(err.to_string(), "fallback");
    }
}
