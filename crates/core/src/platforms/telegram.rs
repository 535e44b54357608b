//! Telegram bot API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{DeliveryError, PlatformClient, SentMessage, check_status};
use crate::destinations::{Credentials, Platform};

const API_BASE: &str = "https://api.telegram.org";

/// Sends HTML-formatted messages to Telegram chats.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base_url: API_BASE.to_string(),
        })
    }

    /// Point the client at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<ApiMessage>,
}

#[derive(Deserialize)]
struct ApiMessage {
    message_id: i64,
}

#[async_trait]
impl PlatformClient for TelegramClient {
    async fn send(
        &self,
        credentials: &Credentials,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<SentMessage, DeliveryError> {
        let Credentials::Telegram { bot_token, chat_id } = credentials else {
            return Err(DeliveryError::WrongCredentials {
                platform: Platform::Telegram,
                given: credentials.platform(),
            });
        };

        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if let Some(message_id) = reply_to.and_then(|id| id.parse::<i64>().ok()) {
            body["reply_to_message_id"] = json!(message_id);
        }

        let response = self
            .http
            .post(format!("{}/bot{bot_token}/sendMessage", self.base_url))
            .json(&body)
            .send()
            .await?;
        let response = check_status(Platform::Telegram, response).await?;

        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::InvalidResponse(e.to_string()))?;

        match (api.ok, api.result) {
            (true, Some(message)) => Ok(SentMessage {
                id: message.message_id.to_string(),
            }),
            _ => Err(DeliveryError::InvalidResponse(
                api.description
                    .unwrap_or_else(|| "sendMessage returned no message".to_string()),
            )),
        }
    }
}
