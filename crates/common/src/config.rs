//! Process configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Process configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Health endpoint configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Chain indexer configuration.
    pub indexer: IndexerConfig,
    /// Polling cadence and staleness policy.
    #[serde(default)]
    pub polling: PollingConfig,
    /// Delivery limits.
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Retry policy per job class.
    #[serde(default)]
    pub jobs: JobsConfig,
    /// Path to the JSON destination document.
    #[serde(default = "default_destinations_path")]
    pub destinations_path: PathBuf,
    /// Block explorer base URL used for transaction links.
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
}

/// Health endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key prefix for all Redis keys.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// Chain indexer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    /// GraphQL endpoint URL.
    pub url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_indexer_timeout")]
    pub timeout_secs: u64,
    /// Maximum number of records fetched per poll.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Polling cadence and staleness policy. All intervals are in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub swap_interval_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub burn_interval_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub liquidity_interval_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub delegation_interval_ms: u64,
    /// Items older than this are bookkept but never announced.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    /// Delay between finality checks of a pending delegation.
    #[serde(default = "default_status_check_interval_ms")]
    pub status_check_interval_ms: u64,
    /// Checks after which a still-pending delegation is reported as an invariant failure.
    #[serde(default = "default_max_status_checks")]
    pub max_status_checks: u32,
    /// Length of one volume summary period.
    #[serde(default = "default_volume_period_secs")]
    pub volume_period_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            swap_interval_ms: default_poll_interval_ms(),
            burn_interval_ms: default_poll_interval_ms(),
            liquidity_interval_ms: default_poll_interval_ms(),
            delegation_interval_ms: default_poll_interval_ms(),
            stale_after_secs: default_stale_after_secs(),
            status_check_interval_ms: default_status_check_interval_ms(),
            max_status_checks: default_max_status_checks(),
            volume_period_secs: default_volume_period_secs(),
        }
    }
}

impl PollingConfig {
    #[must_use]
    pub const fn swap_interval(&self) -> Duration {
        Duration::from_millis(self.swap_interval_ms)
    }

    #[must_use]
    pub const fn burn_interval(&self) -> Duration {
        Duration::from_millis(self.burn_interval_ms)
    }

    #[must_use]
    pub const fn liquidity_interval(&self) -> Duration {
        Duration::from_millis(self.liquidity_interval_ms)
    }

    #[must_use]
    pub const fn delegation_interval(&self) -> Duration {
        Duration::from_millis(self.delegation_interval_ms)
    }

    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    #[must_use]
    pub const fn status_check_interval(&self) -> Duration {
        Duration::from_millis(self.status_check_interval_ms)
    }

    #[must_use]
    pub const fn volume_period(&self) -> Duration {
        Duration::from_secs(self.volume_period_secs)
    }
}

/// Delivery limits.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Maximum Discord message length in characters.
    #[serde(default = "default_discord_max_length")]
    pub discord_max_length: usize,
    /// Timeout applied to every platform request, in seconds.
    #[serde(default = "default_delivery_timeout")]
    pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            discord_max_length: default_discord_max_length(),
            timeout_secs: default_delivery_timeout(),
        }
    }
}

/// Attempts and fixed backoff for one class of jobs.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetrySettings {
    /// Total attempts, including the first one.
    pub attempts: u32,
    /// Fixed delay between attempts in milliseconds.
    pub backoff_ms: u64,
}

impl RetrySettings {
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Retry policy per job class.
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_poll_retry")]
    pub poll: RetrySettings,
    #[serde(default = "default_route_retry")]
    pub route: RetrySettings,
    #[serde(default = "default_send_retry")]
    pub send: RetrySettings,
    /// Period between resubmissions of jobs the queue refused.
    #[serde(default = "default_redelivery_interval_secs")]
    pub redelivery_interval_secs: u64,
}

impl JobsConfig {
    #[must_use]
    pub const fn redelivery_interval(&self) -> Duration {
        Duration::from_secs(self.redelivery_interval_secs)
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            poll: default_poll_retry(),
            route: default_route_retry(),
            send: default_send_retry(),
            redelivery_interval_secs: default_redelivery_interval_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

fn default_redis_prefix() -> String {
    "herald".to_string()
}

const fn default_indexer_timeout() -> u64 {
    20
}

const fn default_page_size() -> u32 {
    100
}

const fn default_poll_interval_ms() -> u64 {
    30_000
}

const fn default_stale_after_secs() -> u64 {
    12 * 3600
}

const fn default_status_check_interval_ms() -> u64 {
    60_000
}

const fn default_max_status_checks() -> u32 {
    30
}

const fn default_volume_period_secs() -> u64 {
    86_400
}

const fn default_discord_max_length() -> usize {
    2000
}

const fn default_delivery_timeout() -> u64 {
    30
}

const fn default_poll_retry() -> RetrySettings {
    RetrySettings {
        attempts: 5,
        backoff_ms: 10_000,
    }
}

const fn default_route_retry() -> RetrySettings {
    RetrySettings {
        attempts: 3,
        backoff_ms: 5_000,
    }
}

const fn default_send_retry() -> RetrySettings {
    RetrySettings {
        attempts: 5,
        backoff_ms: 15_000,
    }
}

const fn default_redelivery_interval_secs() -> u64 {
    30
}

fn default_destinations_path() -> PathBuf {
    PathBuf::from("config/destinations.json")
}

fn default_explorer_url() -> String {
    "https://explorer.example.com".to_string()
}

impl Settings {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `HERALD_ENV`)
    /// 4. Environment variables with `HERALD_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var("HERALD_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("HERALD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("HERALD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
