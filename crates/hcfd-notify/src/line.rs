//! LINE Messaging API push gateway

use hcfd_core::{DeliveryError, DeliveryResult, MessageGateway};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub struct LineGateway {
    client: Client,
    endpoint: String,
    channel_token: String,
}

impl LineGateway {
    pub fn new(endpoint: String, channel_token: String, timeout: Duration) -> DeliveryResult<Self> {
        if endpoint.is_empty() || channel_token.is_empty() {
            return Err(DeliveryError::Transport(
                "invalid LINE gateway configuration".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            channel_token,
        })
    }
}

#[async_trait::async_trait]
impl MessageGateway for LineGateway {
    fn name(&self) -> &str {
        "line"
    }

    async fn send_text(&self, recipient: &str, text: &str) -> DeliveryResult<()> {
        let body = json!({
            "to": recipient,
            "messages": [{ "type": "text", "text": text }],
        });
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.channel_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                recipient: recipient.to_string(),
                reason: format!("{} {}", status, text),
            });
        }

        debug!(%recipient, "Pushed message");
        Ok(())
    }
}
