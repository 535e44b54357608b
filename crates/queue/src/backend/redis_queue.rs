//! Redis-backed queue built on `apalis-redis`.

use std::collections::HashMap;
use std::time::Duration;

use apalis::prelude::Storage;
use apalis_redis::{Config, RedisStorage};
use async_trait::async_trait;
use chrono::Utc;
use herald_common::{AppError, AppResult};
use redis::aio::ConnectionManager;
use tracing::{debug, warn};

use crate::dispatcher::{EnqueueReport, QueueBackend};
use crate::jobs::{QueueName, QueuedJob};

/// How long a dedup key outlives its job's delay before expiring on its own.
const DEDUP_GRACE: Duration = Duration::from_secs(3600);

/// One `RedisStorage` per queue, plus `SET NX` dedup guards.
#[derive(Clone)]
pub struct RedisQueue {
    conn: ConnectionManager,
    prefix: String,
    storages: HashMap<QueueName, RedisStorage<QueuedJob>>,
}

impl RedisQueue {
    /// Create storages for every queue under `{prefix}:{queue}`.
    #[must_use]
    pub fn new(conn: ConnectionManager, prefix: &str) -> Self {
        let storages = QueueName::ALL
            .into_iter()
            .map(|queue| {
                let namespace = format!("{prefix}:{queue}");
                let config = Config::default().set_namespace(&namespace);
                (queue, RedisStorage::new_with_config(conn.clone(), config))
            })
            .collect();
        Self {
            conn,
            prefix: prefix.to_string(),
            storages,
        }
    }

    /// Storage backing `queue`, for registering its worker.
    ///
    /// # Errors
    /// Returns [`AppError::Queue`] if no storage exists for `queue`.
    pub fn storage(&self, queue: QueueName) -> AppResult<RedisStorage<QueuedJob>> {
        self.storages
            .get(&queue)
            .cloned()
            .ok_or_else(|| AppError::Queue(format!("no storage for {queue}")))
    }

    fn guard_key(&self, queue: QueueName, key: &str) -> String {
        format!("{}:dedup:{queue}:{key}", self.prefix)
    }

    /// Claim `key`, returning `false` if it is already held.
    async fn claim(&self, queue: QueueName, key: &str, ttl: Duration) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.guard_key(queue, key))
            .arg(1)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Queue(format!("dedup claim failed: {e}")))?;
        Ok(reply.is_some())
    }

    /// Set `key` whether or not it is held, restarting its expiry.
    async fn refresh(&self, queue: QueueName, key: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(self.guard_key(queue, key))
            .arg(1)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| AppError::Queue(format!("dedup refresh failed: {e}")))
    }

    async fn release(&self, queue: QueueName, key: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(self.guard_key(queue, key))
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| AppError::Queue(format!("dedup release failed: {e}")))
    }

    /// Release the keys of jobs that were claimed but never stored.
    async fn release_all<'a>(&self, queue: QueueName, keys: impl Iterator<Item = &'a str>) {
        for key in keys {
            if let Err(e) = self.release(queue, key).await {
                warn!(queue = %queue, key, error = %e, "Failed to release dedup key");
            }
        }
    }
}

/// Lifetime of the dedup key of `job`.
fn guard_ttl(job: &QueuedJob) -> Duration {
    job.spec
        .options
        .delay
        .unwrap_or_default()
        .saturating_add(DEDUP_GRACE)
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}

/// Unix second at which a job delayed by `delay` becomes runnable.
fn run_at(delay: Duration) -> i64 {
    let mut secs = i64::try_from(delay.as_secs()).unwrap_or(i64::MAX);
    if delay.subsec_nanos() > 0 {
        secs = secs.saturating_add(1);
    }
    Utc::now().timestamp().saturating_add(secs)
}

/// Push or schedule each job in order, stopping at the first failure and
/// returning its index.
async fn push_all(
    storage: RedisStorage<QueuedJob>,
    jobs: &[QueuedJob],
) -> Result<(), (usize, String)> {
    for (sent, job) in jobs.iter().enumerate() {
        let mut storage = storage.clone();
        let result = match job.spec.options.delay {
            Some(delay) if !delay.is_zero() => storage
                .schedule(job.clone(), run_at(delay))
                .await
                .map(|_| ()),
            _ => storage.push(job.clone()).await.map(|_| ()),
        };
        result.map_err(|e| (sent, e.to_string()))?;
    }
    Ok(())
}

#[async_trait]
impl QueueBackend for RedisQueue {
    async fn enqueue_batch(
        &self,
        queue: QueueName,
        jobs: Vec<QueuedJob>,
    ) -> AppResult<EnqueueReport> {
        let storage = self.storage(queue)?;
        let mut report = EnqueueReport::default();

        let mut claimed: Vec<QueuedJob> = Vec::with_capacity(jobs.len());
        for job in jobs {
            if let Some(key) = job.dedup_key() {
                match self.claim(queue, key, guard_ttl(&job)).await {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(queue = %queue, key, "Dedup key held, dropping job");
                        report.deduplicated += 1;
                        continue;
                    }
                    Err(e) => {
                        self.release_all(queue, claimed.iter().filter_map(QueuedJob::dedup_key))
                            .await;
                        return Err(e);
                    }
                }
            }
            claimed.push(job);
        }

        if let Err((sent, e)) = push_all(storage, &claimed).await {
            self.release_all(
                queue,
                claimed[sent..].iter().filter_map(QueuedJob::dedup_key),
            )
            .await;
            return Err(AppError::Queue(format!("failed to store {queue} job: {e}")));
        }
        report.accepted = claimed.len();
        Ok(report)
    }

    async fn enqueue_owned(
        &self,
        queue: QueueName,
        jobs: Vec<QueuedJob>,
    ) -> AppResult<EnqueueReport> {
        let storage = self.storage(queue)?;
        for job in &jobs {
            if let Some(key) = job.dedup_key() {
                self.refresh(queue, key, guard_ttl(job)).await?;
            }
        }

        // Keys stay held on failure: the caller still owns them.
        push_all(storage, &jobs)
            .await
            .map_err(|(_, e)| AppError::Queue(format!("failed to store {queue} job: {e}")))?;
        Ok(EnqueueReport {
            accepted: jobs.len(),
            deduplicated: 0,
        })
    }

    async fn release_dedup(&self, queue: QueueName, key: &str) -> AppResult<()> {
        self.release(queue, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_at_rounds_sub_second_delays_up() {
        let now = Utc::now().timestamp();
        let at = run_at(Duration::from_millis(1500));
        assert!(at >= now + 2 && at <= now + 3);
    }

    #[test]
    fn test_run_at_saturates() {
        assert_eq!(run_at(Duration::MAX), i64::MAX);
    }
}
