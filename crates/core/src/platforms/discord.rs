//! Discord bot API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{DeliveryError, PlatformClient, SentMessage, check_status};
use crate::destinations::{Credentials, Platform};

const API_BASE: &str = "https://discord.com/api/v10";

/// Posts messages to Discord channels as a bot.
#[derive(Clone)]
pub struct DiscordClient {
    http: Client,
    base_url: String,
    max_length: usize,
}

impl DiscordClient {
    /// Create a client enforcing `max_length` characters per message.
    pub fn new(timeout: Duration, max_length: usize) -> Result<Self, DeliveryError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base_url: API_BASE.to_string(),
            max_length,
        })
    }

    /// Point the client at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl PlatformClient for DiscordClient {
    async fn send(
        &self,
        credentials: &Credentials,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<SentMessage, DeliveryError> {
        let Credentials::Discord {
            bot_token,
            channel_id,
        } = credentials
        else {
            return Err(DeliveryError::WrongCredentials {
                platform: Platform::Discord,
                given: credentials.platform(),
            });
        };

        let mut body = json!({
            "content": text,
            "allowed_mentions": { "parse": [] },
        });
        if let Some(message_id) = reply_to {
            body["message_reference"] = json!({
                "message_id": message_id,
                "fail_if_not_exists": false,
            });
        }

        let response = self
            .http
            .post(format!("{}/channels/{channel_id}/messages", self.base_url))
            .header(reqwest::header::AUTHORIZATION, format!("Bot {bot_token}"))
            .json(&body)
            .send()
            .await?;
        let response = check_status(Platform::Discord, response).await?;

        #[derive(Deserialize)]
        struct Message {
            id: String,
        }

        let message: Message = response
            .json()
            .await
            .map_err(|e| DeliveryError::InvalidResponse(e.to_string()))?;
        Ok(SentMessage { id: message.id })
    }

    fn max_message_length(&self) -> Option<usize> {
        Some(self.max_length)
    }
}
