//! Platform delivery clients.
//!
//! Each platform exposes a single `send` primitive. Clients classify an HTTP
//! 429 as [`DeliveryError::RateLimited`] so the job layer can abort instead of
//! retrying into the limit.

mod discord;
mod telegram;
mod twitter;

use std::sync::Arc;

use async_trait::async_trait;
use herald_common::AppError;
use reqwest::{Response, StatusCode};
use thiserror::Error;

use crate::destinations::{Credentials, Platform};

pub use discord::DiscordClient;
pub use telegram::TelegramClient;
pub use twitter::TwitterClient;

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Platform message id, usable as a reply target.
    pub id: String,
}

/// Failure delivering a message.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("{platform} rate limit hit (retry after {retry_after:?}s)")]
    RateLimited {
        platform: Platform,
        retry_after: Option<u64>,
    },

    #[error("{platform} responded {status}: {body}")]
    Http {
        platform: Platform,
        status: u16,
        body: String,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("{platform} client cannot use {given} credentials")]
    WrongCredentials { platform: Platform, given: Platform },
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::RateLimited { platform, .. } => Self::RateLimited(platform.to_string()),
            DeliveryError::WrongCredentials { .. } => Self::Config(err.to_string()),
            _ => Self::Delivery(err.to_string()),
        }
    }
}

/// A messaging platform that can deliver text to a destination.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Deliver `text`, threading it under `reply_to` when given.
    async fn send(
        &self,
        credentials: &Credentials,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<SentMessage, DeliveryError>;

    /// Maximum message length in characters, if the platform enforces one.
    fn max_message_length(&self) -> Option<usize> {
        None
    }
}

/// One client per platform.
#[derive(Clone)]
pub struct PlatformClients {
    pub discord: Arc<dyn PlatformClient>,
    pub telegram: Arc<dyn PlatformClient>,
    pub twitter: Arc<dyn PlatformClient>,
}

impl PlatformClients {
    #[must_use]
    pub fn for_platform(&self, platform: Platform) -> &dyn PlatformClient {
        match platform {
            Platform::Discord => self.discord.as_ref(),
            Platform::Telegram => self.telegram.as_ref(),
            Platform::Twitter => self.twitter.as_ref(),
        }
    }
}

/// Map non-success statuses to [`DeliveryError`].
pub(crate) async fn check_status(
    platform: Platform,
    response: Response,
) -> Result<Response, DeliveryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<f64>().ok())
            .map(|secs| secs.ceil() as u64);
        return Err(DeliveryError::RateLimited {
            platform,
            retry_after,
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(DeliveryError::Http {
        platform,
        status: status.as_u16(),
        body,
    })
}
