//! Telegram alert transport.
//!
//! Delivery is best-effort: failures are logged and swallowed, the monitoring
//! cycle never depends on the messenger being reachable.

use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::alerts::Severity;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Serialize)]
pub struct SendMessagePayload {
    pub chat_id: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct TelegramManager {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramManager {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: TELEGRAM_API_BASE.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    /// Point the manager at a different API host (used by tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn severity_prefix(severity: Severity) -> &'static str {
        match severity {
            Severity::Info => "ℹ️",
            Severity::Warning => "⚠️",
        }
    }

    #[instrument(skip(self, text))]
    pub async fn send_message(&self, text: &str, severity: Severity) {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let payload = SendMessagePayload {
            chat_id: self.chat_id.clone(),
            text: format!("{} {}", Self::severity_prefix(severity), text),
        };

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("sent Telegram alert");
                } else {
                    error!("Telegram alert failed with status: {}", response.status());
                    if let Ok(body) = response.text().await {
                        error!("Telegram API error response: {body}");
                    }
                }
            }
            Err(e) => {
                error!("failed to send Telegram alert: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_message_posts_to_bot_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": "4242",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let manager = TelegramManager::new("test-token", "4242").with_api_base(server.uri());
        manager.send_message("High temperature: 31.0°C", Severity::Warning).await;
    }

    #[tokio::test]
    async fn test_failed_send_does_not_panic() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let manager = TelegramManager::new("test-token", "4242").with_api_base(server.uri());
        // Best-effort: the call just logs the failure.
        manager.send_message("anything", Severity::Info).await;
    }
}
