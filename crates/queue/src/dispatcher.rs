//! Batch submission of jobs to the queue substrate.

use std::sync::Arc;

use async_trait::async_trait;
use herald_common::{AppError, AppResult, Metrics};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::jobs::{JobSpec, QueueName, QueuedJob};

/// Outcome of an accepted batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueReport {
    /// Jobs stored by the substrate.
    pub accepted: usize,
    /// Jobs dropped because their dedup key was held.
    pub deduplicated: usize,
}

/// A durable job queue.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Store every job of `jobs` on `queue`, or none of them on error.
    ///
    /// A job whose dedup key is already held on `queue` is dropped.
    async fn enqueue_batch(&self, queue: QueueName, jobs: Vec<QueuedJob>)
    -> AppResult<EnqueueReport>;

    /// Store every job of `jobs` on `queue`, taking their dedup keys even when
    /// held.
    ///
    /// Used for jobs whose key the caller already owns.
    async fn enqueue_owned(&self, queue: QueueName, jobs: Vec<QueuedJob>)
    -> AppResult<EnqueueReport>;

    /// Free `key` on `queue` so a new job may claim it.
    async fn release_dedup(&self, queue: QueueName, key: &str) -> AppResult<()>;
}

/// How a retry submission was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    /// The retry is stored.
    Scheduled,
    /// Another pending job holds the dedup key, so the retry was dropped.
    Superseded,
}

/// A submission the substrate refused, kept until it is stored.
#[derive(Debug, Clone)]
struct Stranded {
    queue: QueueName,
    jobs: Vec<QueuedJob>,
    owned: bool,
}

/// Submits job batches to the queue substrate.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn QueueBackend>,
    metrics: Arc<Metrics>,
    stranded: Arc<Mutex<Vec<Stranded>>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(backend: Arc<dyn QueueBackend>, metrics: Arc<Metrics>) -> Self {
        Self {
            backend,
            metrics,
            stranded: Arc::default(),
        }
    }

    /// Submit `batch` to `queue` as one unit.
    ///
    /// # Errors
    /// Returns [`AppError::Invariant`] if an entry belongs to another queue,
    /// or the substrate's error if it rejects the batch.
    pub async fn dispatch(&self, queue: QueueName, batch: Vec<JobSpec>) -> AppResult<()> {
        let jobs = check_batch(queue, batch)?;
        if jobs.is_empty() {
            return Ok(());
        }
        self.store(queue, jobs, false).await.map(|_| ())
    }

    /// Submit `batch` like [`Dispatcher::dispatch`], holding it for
    /// [`Dispatcher::redeliver_stranded`] if the substrate rejects it.
    ///
    /// # Errors
    /// Returns [`AppError::Invariant`] if an entry belongs to another queue.
    pub async fn dispatch_or_hold(&self, queue: QueueName, batch: Vec<JobSpec>) -> AppResult<()> {
        let jobs = check_batch(queue, batch)?;
        if jobs.is_empty() {
            return Ok(());
        }
        if self.store(queue, jobs.clone(), false).await.is_err() {
            self.hold(Stranded {
                queue,
                jobs,
                owned: false,
            })
            .await;
        }
        Ok(())
    }

    /// Submit another attempt of an already-queued job.
    ///
    /// With `owned` set the job's dedup key is taken even if still held. A
    /// retry the substrate rejects is held for redelivery.
    ///
    /// # Errors
    /// Returns the substrate's error if it rejects the retry.
    pub(crate) async fn requeue(&self, job: QueuedJob, owned: bool) -> AppResult<Requeue> {
        let queue = job.queue();
        match self.store(queue, vec![job.clone()], owned).await {
            Ok(report) if report.accepted == 0 => Ok(Requeue::Superseded),
            Ok(_) => Ok(Requeue::Scheduled),
            Err(e) => {
                self.hold(Stranded {
                    queue,
                    jobs: vec![job],
                    owned,
                })
                .await;
                Err(e)
            }
        }
    }

    /// Free a dedup key held by a job that has started running.
    pub(crate) async fn release_dedup(&self, queue: QueueName, key: &str) -> AppResult<()> {
        self.backend.release_dedup(queue, key).await
    }

    /// Try again to store every held submission, returning how many were
    /// stored. Submissions rejected again stay held.
    pub async fn redeliver_stranded(&self) -> usize {
        let stranded = std::mem::take(&mut *self.stranded.lock().await);
        if stranded.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        let mut still = Vec::new();
        for entry in stranded {
            match self.store(entry.queue, entry.jobs.clone(), entry.owned).await {
                Ok(_) => delivered += 1,
                Err(_) => still.push(entry),
            }
        }
        let remaining = still.len();
        self.stranded.lock().await.extend(still);

        info!(delivered, remaining, "Redelivered stranded jobs");
        delivered
    }

    /// Number of submissions waiting for redelivery.
    pub async fn stranded_len(&self) -> usize {
        self.stranded.lock().await.len()
    }

    async fn hold(&self, entry: Stranded) {
        error!(
            queue = %entry.queue,
            count = entry.jobs.len(),
            "Holding rejected jobs for redelivery"
        );
        self.stranded.lock().await.push(entry);
    }

    async fn store(
        &self,
        queue: QueueName,
        jobs: Vec<QueuedJob>,
        owned: bool,
    ) -> AppResult<EnqueueReport> {
        let count = jobs.len();
        let result = if owned {
            self.backend.enqueue_owned(queue, jobs).await
        } else {
            self.backend.enqueue_batch(queue, jobs).await
        };
        match result {
            Ok(report) => {
                self.metrics
                    .record_enqueued(report.accepted as u64, report.deduplicated as u64);
                debug!(
                    queue = %queue,
                    accepted = report.accepted,
                    deduplicated = report.deduplicated,
                    "Dispatched batch"
                );
                Ok(report)
            }
            Err(e) => {
                error!(queue = %queue, count, error = %e, "Failed to dispatch batch");
                Err(e)
            }
        }
    }
}

fn check_batch(queue: QueueName, batch: Vec<JobSpec>) -> AppResult<Vec<QueuedJob>> {
    if let Some(stray) = batch.iter().find(|spec| spec.queue() != queue) {
        return Err(AppError::Invariant(format!(
            "{} job dispatched to {queue}",
            stray.queue()
        )));
    }
    Ok(batch.into_iter().map(QueuedJob::new).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use herald_core::Cursor;

    use super::*;
    use crate::backend::MemoryQueue;
    use crate::jobs::{JobData, JobOptions, PollCursor, SendMessage};

    fn dispatcher() -> (Dispatcher, Arc<MemoryQueue>, Arc<Metrics>) {
        let queue = Arc::new(MemoryQueue::new());
        let metrics = Arc::new(Metrics::new());
        (
            Dispatcher::new(queue.clone(), metrics.clone()),
            queue,
            metrics,
        )
    }

    fn send(text: &str) -> JobSpec {
        JobSpec::new(JobData::SendMessage(SendMessage {
            destination_key: "discord:alerts".into(),
            text: text.into(),
            reply_to: None,
        }))
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let (dispatcher, queue, _) = dispatcher();
        dispatcher
            .dispatch(QueueName::SendMessage, Vec::new())
            .await
            .unwrap();
        assert!(queue.batches().await.is_empty());
    }

    #[tokio::test]
    async fn test_batch_is_submitted_in_one_call() {
        let (dispatcher, queue, metrics) = dispatcher();
        dispatcher
            .dispatch(QueueName::SendMessage, vec![send("a"), send("b")])
            .await
            .unwrap();

        let batches = queue.batches().await;
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, QueueName::SendMessage);
        assert_eq!(batches[0].1.len(), 2);
        assert_eq!(metrics.snapshot().jobs_enqueued, 2);
    }

    #[tokio::test]
    async fn test_mismatched_queue_is_rejected() {
        let (dispatcher, queue, _) = dispatcher();
        let poll = JobSpec::new(JobData::PollSwaps(PollCursor {
            last_cursor: Cursor(1),
        }));
        let err = dispatcher
            .dispatch(QueueName::SendMessage, vec![send("a"), poll])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Invariant(_)));
        assert!(queue.batches().await.is_empty());
    }

    #[tokio::test]
    async fn test_owned_retry_takes_a_held_key() {
        let (dispatcher, queue, _) = dispatcher();
        let job = QueuedJob::new(JobSpec::with_options(
            JobData::PollSwaps(PollCursor {
                last_cursor: Cursor(1),
            }),
            JobOptions::default().with_dedup_key("poll-swaps"),
        ));
        dispatcher
            .dispatch(QueueName::PollSwaps, vec![job.spec.clone()])
            .await
            .unwrap();
        queue.take(QueueName::PollSwaps).await;

        let plain = dispatcher.requeue(job.next_attempt(), false).await.unwrap();
        assert_eq!(plain, Requeue::Superseded);

        let owned = dispatcher.requeue(job.next_attempt(), true).await.unwrap();
        assert_eq!(owned, Requeue::Scheduled);
        assert_eq!(queue.take(QueueName::PollSwaps).await.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_batch_is_held_until_redelivered() {
        let (dispatcher, queue, _) = dispatcher();
        queue.fail_next_batches(2).await;

        dispatcher
            .dispatch_or_hold(QueueName::SendMessage, vec![send("a")])
            .await
            .unwrap();
        assert_eq!(dispatcher.stranded_len().await, 1);

        assert_eq!(dispatcher.redeliver_stranded().await, 0);
        assert_eq!(dispatcher.stranded_len().await, 1);

        assert_eq!(dispatcher.redeliver_stranded().await, 1);
        assert_eq!(dispatcher.stranded_len().await, 0);
        assert_eq!(queue.take(QueueName::SendMessage).await.len(), 1);
    }
}
