//! Destination registry.
//!
//! The destination document is a JSON file with one section per platform.
//! Each section carries the platform-wide credential and a list of channels:
//!
//! ```json
//! {
//!   "discord": {
//!     "token": "bot-token",
//!     "channels": [
//!       { "name": "big swaps", "enabled": true, "channelId": "1234",
//!         "filters": [{ "name": "NEW_SWAP", "minUsdValue": 1000 }] }
//!     ]
//!   },
//!   "telegram": { "token": "bot-token", "channels": [{ "name": "main", "channelId": "-100" }] },
//!   "twitter": {
//!     "consumerKey": "ck", "consumerSecret": "cs",
//!     "channels": [{ "name": "feed", "accessToken": "at", "accessSecret": "as" }]
//!   }
//! }
//! ```
//!
//! The registry is built once at startup and never mutated afterwards.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use herald_common::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::filter::{FilterRule, NotificationEvent, can_send};

/// Messaging platform a destination lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Discord,
    Telegram,
    Twitter,
}

impl Platform {
    /// Every platform, in routing order.
    pub const ALL: [Self; 3] = [Self::Discord, Self::Telegram, Self::Twitter];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discord => "discord",
            Self::Telegram => "telegram",
            Self::Twitter => "twitter",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform-specific delivery credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Discord {
        bot_token: String,
        channel_id: String,
    },
    Telegram {
        bot_token: String,
        chat_id: String,
    },
    Twitter {
        consumer_key: String,
        consumer_secret: String,
        access_token: String,
        access_secret: String,
    },
}

impl Credentials {
    #[must_use]
    pub const fn platform(&self) -> Platform {
        match self {
            Self::Discord { .. } => Platform::Discord,
            Self::Telegram { .. } => Platform::Telegram,
            Self::Twitter { .. } => Platform::Twitter,
        }
    }
}

// Secrets never reach logs, even through `{:?}`.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discord { channel_id, .. } => f
                .debug_struct("Discord")
                .field("bot_token", &"<redacted>")
                .field("channel_id", channel_id)
                .finish(),
            Self::Telegram { chat_id, .. } => f
                .debug_struct("Telegram")
                .field("bot_token", &"<redacted>")
                .field("chat_id", chat_id)
                .finish(),
            Self::Twitter { .. } => f
                .debug_struct("Twitter")
                .field("consumer_key", &"<redacted>")
                .field("consumer_secret", &"<redacted>")
                .field("access_token", &"<redacted>")
                .field("access_secret", &"<redacted>")
                .finish(),
        }
    }
}

/// A configured channel that receives notifications.
#[derive(Debug, Clone)]
pub struct Destination {
    /// Stable key, `"{platform}:{normalized name}"`.
    pub key: String,
    pub name: String,
    pub credentials: Credentials,
    /// `None` accepts every message class.
    pub filters: Option<Vec<FilterRule>>,
}

impl Destination {
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.credentials.platform()
    }

    /// Whether this destination accepts `event` under its filter list.
    #[must_use]
    pub fn accepts(&self, event: &NotificationEvent) -> bool {
        can_send(self.filters.as_deref(), event)
    }
}

/// Replace each whitespace character with an underscore.
#[must_use]
pub fn normalize_channel_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

#[must_use]
pub fn destination_key(platform: Platform, name: &str) -> String {
    format!("{platform}:{}", normalize_channel_name(name))
}

// === Document ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelEntry<T> {
    name: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    filters: Option<Vec<FilterRule>>,
    #[serde(flatten)]
    target: T,
}

const fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelTarget {
    channel_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TwitterTarget {
    access_token: String,
    access_secret: String,
}

#[derive(Debug, Deserialize)]
struct BotSection {
    token: String,
    #[serde(default)]
    channels: Vec<ChannelEntry<ChannelTarget>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TwitterSection {
    consumer_key: String,
    consumer_secret: String,
    #[serde(default)]
    channels: Vec<ChannelEntry<TwitterTarget>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DestinationDocument {
    #[serde(default)]
    discord: Option<BotSection>,
    #[serde(default)]
    telegram: Option<BotSection>,
    #[serde(default)]
    twitter: Option<TwitterSection>,
}

/// Immutable lookup of configured destinations.
#[derive(Debug, Default)]
pub struct DestinationRegistry {
    destinations: Vec<Destination>,
    by_key: HashMap<String, usize>,
}

impl DestinationRegistry {
    /// Read and validate the destination document at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Parse and validate a destination document.
    pub fn from_json(raw: &str) -> AppResult<Self> {
        let document: DestinationDocument = serde_json::from_str(raw)
            .map_err(|e| AppError::Config(format!("Malformed destination document: {e}")))?;
        Self::from_document(document)
    }

    fn from_document(document: DestinationDocument) -> AppResult<Self> {
        let mut destinations = Vec::new();

        if let Some(section) = document.discord {
            assert_unique(Platform::Discord, section.channels.iter().map(|c| c.name.as_str()))?;
            for channel in section.channels.into_iter().filter(|c| c.enabled) {
                destinations.push(Destination {
                    key: destination_key(Platform::Discord, &channel.name),
                    name: channel.name,
                    credentials: Credentials::Discord {
                        bot_token: section.token.clone(),
                        channel_id: channel.target.channel_id,
                    },
                    filters: channel.filters,
                });
            }
        }

        if let Some(section) = document.telegram {
            assert_unique(Platform::Telegram, section.channels.iter().map(|c| c.name.as_str()))?;
            for channel in section.channels.into_iter().filter(|c| c.enabled) {
                destinations.push(Destination {
                    key: destination_key(Platform::Telegram, &channel.name),
                    name: channel.name,
                    credentials: Credentials::Telegram {
                        bot_token: section.token.clone(),
                        chat_id: channel.target.channel_id,
                    },
                    filters: channel.filters,
                });
            }
        }

        if let Some(section) = document.twitter {
            assert_unique(Platform::Twitter, section.channels.iter().map(|c| c.name.as_str()))?;
            for channel in section.channels.into_iter().filter(|c| c.enabled) {
                destinations.push(Destination {
                    key: destination_key(Platform::Twitter, &channel.name),
                    name: channel.name,
                    credentials: Credentials::Twitter {
                        consumer_key: section.consumer_key.clone(),
                        consumer_secret: section.consumer_secret.clone(),
                        access_token: channel.target.access_token,
                        access_secret: channel.target.access_secret,
                    },
                    filters: channel.filters,
                });
            }
        }

        Ok(Self::from_destinations(destinations))
    }

    /// Build a registry from already validated destinations.
    #[must_use]
    pub fn from_destinations(destinations: Vec<Destination>) -> Self {
        let by_key = destinations
            .iter()
            .enumerate()
            .map(|(i, d)| (d.key.clone(), i))
            .collect();
        Self {
            destinations,
            by_key,
        }
    }

    /// Resolve a destination by key.
    pub fn get(&self, key: &str) -> AppResult<&Destination> {
        self.by_key
            .get(key)
            .map(|&i| &self.destinations[i])
            .ok_or_else(|| AppError::DestinationNotFound(key.to_string()))
    }

    /// All enabled destinations on `platform`, in document order.
    pub fn for_platform(&self, platform: Platform) -> impl Iterator<Item = &Destination> {
        self.destinations
            .iter()
            .filter(move |d| d.platform() == platform)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}

fn assert_unique<'a>(platform: Platform, names: impl Iterator<Item = &'a str>) -> AppResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        let normalized = normalize_channel_name(name);
        if !seen.insert(normalized.clone()) {
            return Err(AppError::DuplicateChannel {
                platform: platform.to_string(),
                name: normalized,
            });
        }
    }
    Ok(())
}
