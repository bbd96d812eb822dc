// libs/notification-cell/src/services/channel.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use crate::models::NotificationError;

/// External outbound-messaging collaborator. The concrete transport
/// (SMS/WhatsApp/email relay) is irrelevant here; it accepts a destination
/// address and a body and reports success or failure.
#[async_trait]
pub trait SendChannel: Send + Sync {
    async fn send(&self, destination: &str, body: &str) -> Result<(), NotificationError>;
}

/// Posts messages to the configured HTTP gateway (the clinic's messaging
/// relay).
pub struct HttpSendChannel {
    client: Client,
    gateway_url: String,
    token: String,
}

impl HttpSendChannel {
    pub fn new(gateway_url: String, token: String) -> Self {
        Self {
            client: Client::new(),
            gateway_url,
            token,
        }
    }
}

#[async_trait]
impl SendChannel for HttpSendChannel {
    async fn send(&self, destination: &str, body: &str) -> Result<(), NotificationError> {
        debug!("Posting message for {} to gateway", destination);

        let mut request = self.client.post(&self.gateway_url).json(&json!({
            "to": destination,
            "body": body,
        }));
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotificationError::Channel(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::GatewayStatus(status.as_u16()));
        }
        Ok(())
    }
}

/// Fallback when no gateway is configured: messages land in the log instead
/// of being dropped silently.
pub struct LogSendChannel;

#[async_trait]
impl SendChannel for LogSendChannel {
    async fn send(&self, destination: &str, body: &str) -> Result<(), NotificationError> {
        info!("[To {}]: {}", destination, body);
        Ok(())
    }
}
