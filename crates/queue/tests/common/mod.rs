//! Shared fakes for the queue integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use herald_common::{AppError, AppResult, LivenessMonitor, Metrics};
use herald_core::{
    Burn, ChainDataSource, Credentials, Cursor, Delegation, DelegationKind, DelegationStatus,
    DeliveryError, DestinationRegistry, LiquidityDeposit, Platform, PlatformClient,
    PlatformClients, SentMessage, SourceError, Swap, VolumeSummary,
};
use herald_queue::{
    Dispatcher, EnqueueReport, JobContext, MemoryQueue, QueueBackend, QueueName, QueuedJob,
    WorkerConfig,
};

pub const DESTINATIONS: &str = r#"{
    "discord": {
        "token": "discord-token",
        "channels": [
            { "name": "burns", "channelId": "100",
              "filters": [{ "name": "NEW_BURN" }] },
            { "name": "whales", "channelId": "200",
              "filters": [{ "name": "NEW_SWAP", "minUsdValue": 1000 }] }
        ]
    },
    "telegram": {
        "token": "telegram-token",
        "channels": [{ "name": "everything", "channelId": "-1001" }]
    },
    "twitter": {
        "consumerKey": "ck", "consumerSecret": "cs",
        "channels": [{ "name": "feed", "accessToken": "at", "accessSecret": "as",
                       "filters": [{ "name": "NEW_BURN" }] }]
    }
}"#;

// === Data source ===

#[derive(Default)]
pub struct FakeSource {
    pub swaps: Mutex<Vec<Swap>>,
    pub burns: Mutex<Vec<Burn>>,
    pub deposits: Mutex<Vec<LiquidityDeposit>>,
    pub delegations: Mutex<Vec<Delegation>>,
    pub statuses: Mutex<HashMap<String, DelegationStatus>>,
    pub summary: Mutex<Option<VolumeSummary>>,
    pub failing: Mutex<bool>,
}

impl FakeSource {
    fn check(&self) -> Result<(), SourceError> {
        if *self.failing.lock().unwrap() {
            return Err(SourceError::Query("indexer unavailable".into()));
        }
        Ok(())
    }
}

fn newest<T>(items: &[T], id: impl Fn(&T) -> Cursor) -> Cursor {
    items.iter().map(id).max().unwrap_or_default()
}

fn since<T: Clone>(items: &[T], cursor: Cursor, id: impl Fn(&T) -> Cursor) -> Vec<T> {
    items.iter().filter(|item| id(item) > cursor).cloned().collect()
}

#[async_trait]
impl ChainDataSource for FakeSource {
    async fn latest_swap_id(&self) -> Result<Cursor, SourceError> {
        self.check()?;
        Ok(newest(&self.swaps.lock().unwrap(), |s| s.id))
    }

    async fn swaps_since(&self, cursor: Cursor) -> Result<Vec<Swap>, SourceError> {
        self.check()?;
        Ok(since(&self.swaps.lock().unwrap(), cursor, |s| s.id))
    }

    async fn latest_burn_id(&self) -> Result<Cursor, SourceError> {
        self.check()?;
        Ok(newest(&self.burns.lock().unwrap(), |b| b.id))
    }

    async fn burns_since(&self, cursor: Cursor) -> Result<Vec<Burn>, SourceError> {
        self.check()?;
        Ok(since(&self.burns.lock().unwrap(), cursor, |b| b.id))
    }

    async fn latest_deposit_id(&self) -> Result<Cursor, SourceError> {
        self.check()?;
        Ok(newest(&self.deposits.lock().unwrap(), |d| d.id))
    }

    async fn deposits_since(&self, cursor: Cursor) -> Result<Vec<LiquidityDeposit>, SourceError> {
        self.check()?;
        Ok(since(&self.deposits.lock().unwrap(), cursor, |d| d.id))
    }

    async fn latest_delegation_id(&self) -> Result<Cursor, SourceError> {
        self.check()?;
        Ok(newest(&self.delegations.lock().unwrap(), |d| d.id))
    }

    async fn delegations_since(&self, cursor: Cursor) -> Result<Vec<Delegation>, SourceError> {
        self.check()?;
        Ok(since(&self.delegations.lock().unwrap(), cursor, |d| d.id))
    }

    async fn delegation_status(&self, tx_hash: &str) -> Result<DelegationStatus, SourceError> {
        self.check()?;
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(tx_hash)
            .copied()
            .unwrap_or(DelegationStatus::Pending))
    }

    async fn volume_summary(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<VolumeSummary, SourceError> {
        self.check()?;
        let mut summary = self.summary.lock().unwrap().clone().unwrap_or(VolumeSummary {
            period_start: start,
            period_end: end,
            volume_usd: 0.0,
            swap_count: 0,
            unique_traders: 0,
            burned_usd: 0.0,
        });
        summary.period_start = start;
        summary.period_end = end;
        Ok(summary)
    }
}

// === Platform client ===

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub credentials: Credentials,
    pub text: String,
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    RateLimited,
    ServerError,
}

pub struct FakeClient {
    platform: Platform,
    max_length: Option<usize>,
    pub sent: Mutex<Vec<Sent>>,
    pub failure: Mutex<Option<Failure>>,
}

impl FakeClient {
    pub fn new(platform: Platform, max_length: Option<usize>) -> Self {
        Self {
            platform,
            max_length,
            sent: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    pub fn fail_with(&self, failure: Failure) {
        *self.failure.lock().unwrap() = Some(failure);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformClient for FakeClient {
    async fn send(
        &self,
        credentials: &Credentials,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<SentMessage, DeliveryError> {
        match *self.failure.lock().unwrap() {
            Some(Failure::RateLimited) => {
                return Err(DeliveryError::RateLimited {
                    platform: self.platform,
                    retry_after: Some(30),
                });
            }
            Some(Failure::ServerError) => {
                return Err(DeliveryError::Http {
                    platform: self.platform,
                    status: 502,
                    body: "bad gateway".into(),
                });
            }
            None => {}
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(Sent {
            credentials: credentials.clone(),
            text: text.to_string(),
            reply_to: reply_to.map(str::to_string),
        });
        Ok(SentMessage {
            id: format!("{}-{}", self.platform, sent.len()),
        })
    }

    fn max_message_length(&self) -> Option<usize> {
        self.max_length
    }
}

// === Queue ===

/// A [`MemoryQueue`] whose next `failures` key releases fail.
pub struct StickyKeys {
    inner: Arc<MemoryQueue>,
    failures: Mutex<usize>,
}

#[async_trait]
impl QueueBackend for StickyKeys {
    async fn enqueue_batch(
        &self,
        queue: QueueName,
        jobs: Vec<QueuedJob>,
    ) -> AppResult<EnqueueReport> {
        self.inner.enqueue_batch(queue, jobs).await
    }

    async fn enqueue_owned(
        &self,
        queue: QueueName,
        jobs: Vec<QueuedJob>,
    ) -> AppResult<EnqueueReport> {
        self.inner.enqueue_owned(queue, jobs).await
    }

    async fn release_dedup(&self, queue: QueueName, key: &str) -> AppResult<()> {
        {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(AppError::Queue("connection reset".into()));
            }
        }
        self.inner.release_dedup(queue, key).await
    }
}

// === Harness ===

pub struct Harness {
    pub ctx: JobContext,
    pub queue: Arc<MemoryQueue>,
    pub source: Arc<FakeSource>,
    pub discord: Arc<FakeClient>,
    pub telegram: Arc<FakeClient>,
    pub twitter: Arc<FakeClient>,
    pub metrics: Arc<Metrics>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_destinations(DESTINATIONS)
    }

    pub fn with_destinations(document: &str) -> Self {
        Self::build(document, |queue| queue as Arc<dyn QueueBackend>)
    }

    /// A harness whose next `failures` dedup key releases fail.
    pub fn with_failing_releases(failures: usize) -> Self {
        Self::build(DESTINATIONS, |inner| {
            Arc::new(StickyKeys {
                inner,
                failures: Mutex::new(failures),
            })
        })
    }

    fn build(
        document: &str,
        backend: impl FnOnce(Arc<MemoryQueue>) -> Arc<dyn QueueBackend>,
    ) -> Self {
        let queue = Arc::new(MemoryQueue::new());
        let source = Arc::new(FakeSource::default());
        let discord = Arc::new(FakeClient::new(Platform::Discord, Some(2000)));
        let telegram = Arc::new(FakeClient::new(Platform::Telegram, None));
        let twitter = Arc::new(FakeClient::new(Platform::Twitter, None));
        let metrics = Arc::new(Metrics::new());

        let ctx = JobContext {
            dispatcher: Dispatcher::new(backend(queue.clone()), metrics.clone()),
            source: source.clone(),
            registry: Arc::new(DestinationRegistry::from_json(document).unwrap()),
            clients: PlatformClients {
                discord: discord.clone(),
                telegram: telegram.clone(),
                twitter: twitter.clone(),
            },
            config: Arc::new(WorkerConfig::default()),
            liveness: Arc::new(LivenessMonitor::new()),
            metrics: metrics.clone(),
        };

        Self {
            ctx,
            queue,
            source,
            discord,
            telegram,
            twitter,
            metrics,
        }
    }
}

// === Records ===

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    Utc::now() - ChronoDuration::hours(hours)
}

pub fn burn(id: u64, timestamp: DateTime<Utc>, usd_value: f64) -> Burn {
    Burn {
        id: Cursor(id),
        timestamp,
        tx_hash: format!("0xburn{id}"),
        burner: "0x1111111111111111111111111111111111110000".into(),
        token: "HRD".into(),
        amount: 12.5,
        usd_value,
    }
}

pub fn swap(id: u64, timestamp: DateTime<Utc>, usd_value: f64) -> Swap {
    Swap {
        id: Cursor(id),
        timestamp,
        tx_hash: format!("0xswap{id}"),
        trader: "0x2222222222222222222222222222222222220000".into(),
        token_in: "USDC".into(),
        token_out: "HRD".into(),
        amount_in: usd_value,
        amount_out: usd_value / 2.0,
        usd_value,
    }
}

pub fn delegation(id: u64, timestamp: DateTime<Utc>) -> Delegation {
    Delegation {
        id: Cursor(id),
        timestamp,
        tx_hash: format!("0xdelegation{id}"),
        delegator: "0x3333333333333333333333333333333333330000".into(),
        validator: "validator-1".into(),
        amount: 500.0,
        kind: DelegationKind::Delegate,
    }
}
