//! In-process queue for tests and dry runs.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use herald_common::{AppError, AppResult};
use tokio::sync::Mutex;

use crate::dispatcher::{EnqueueReport, QueueBackend};
use crate::jobs::{QueueName, QueuedJob};

#[derive(Debug, Default)]
struct State {
    history: Vec<(QueueName, Vec<QueuedJob>)>,
    pending: VecDeque<QueuedJob>,
    held: HashSet<(QueueName, String)>,
    failures: usize,
}

/// Records every accepted batch and applies the dedup rule.
///
/// Delays are recorded but not waited for: [`MemoryQueue::take`] hands out
/// pending jobs immediately.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: Mutex<State>,
}

impl MemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepted batches in submission order.
    pub async fn batches(&self) -> Vec<(QueueName, Vec<QueuedJob>)> {
        self.state.lock().await.history.clone()
    }

    /// Every job ever accepted on `queue`.
    pub async fn jobs(&self, queue: QueueName) -> Vec<QueuedJob> {
        self.state
            .lock()
            .await
            .history
            .iter()
            .filter(|(q, _)| *q == queue)
            .flat_map(|(_, jobs)| jobs.iter().cloned())
            .collect()
    }

    /// Remove and return the pending jobs of `queue`, oldest first.
    pub async fn take(&self, queue: QueueName) -> Vec<QueuedJob> {
        let mut state = self.state.lock().await;
        let (taken, kept): (VecDeque<_>, VecDeque<_>) =
            state.pending.drain(..).partition(|job| job.queue() == queue);
        state.pending = kept;
        taken.into()
    }

    /// Whether `key` is held on `queue`.
    pub async fn is_held(&self, queue: QueueName, key: &str) -> bool {
        self.state
            .lock()
            .await
            .held
            .contains(&(queue, key.to_string()))
    }

    /// Make the next submission fail.
    pub async fn fail_next_batch(&self) {
        self.fail_next_batches(1).await;
    }

    /// Make the next `count` submissions fail.
    pub async fn fail_next_batches(&self, count: usize) {
        self.state.lock().await.failures += count;
    }
}

impl State {
    fn check_outage(&mut self, queue: QueueName) -> AppResult<()> {
        if self.failures == 0 {
            return Ok(());
        }
        self.failures -= 1;
        Err(AppError::Queue(format!("{queue} rejected the batch")))
    }

    fn accept(&mut self, queue: QueueName, accepted: Vec<QueuedJob>) {
        if !accepted.is_empty() {
            self.pending.extend(accepted.iter().cloned());
            self.history.push((queue, accepted));
        }
    }
}

#[async_trait]
impl QueueBackend for MemoryQueue {
    async fn enqueue_batch(
        &self,
        queue: QueueName,
        jobs: Vec<QueuedJob>,
    ) -> AppResult<EnqueueReport> {
        let mut state = self.state.lock().await;
        state.check_outage(queue)?;

        let mut report = EnqueueReport::default();
        let mut accepted = Vec::with_capacity(jobs.len());
        for job in jobs {
            if let Some(key) = job.dedup_key() {
                if !state.held.insert((queue, key.to_string())) {
                    report.deduplicated += 1;
                    continue;
                }
            }
            accepted.push(job);
        }

        report.accepted = accepted.len();
        state.accept(queue, accepted);
        Ok(report)
    }

    async fn enqueue_owned(
        &self,
        queue: QueueName,
        jobs: Vec<QueuedJob>,
    ) -> AppResult<EnqueueReport> {
        let mut state = self.state.lock().await;
        state.check_outage(queue)?;

        for key in jobs.iter().filter_map(QueuedJob::dedup_key) {
            state.held.insert((queue, key.to_string()));
        }
        let report = EnqueueReport {
            accepted: jobs.len(),
            deduplicated: 0,
        };
        state.accept(queue, jobs);
        Ok(report)
    }

    async fn release_dedup(&self, queue: QueueName, key: &str) -> AppResult<()> {
        self.state
            .lock()
            .await
            .held
            .remove(&(queue, key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use herald_core::Cursor;

    use super::*;
    use crate::jobs::{JobData, JobOptions, JobSpec, PollCursor};

    fn poll(cursor: u64) -> QueuedJob {
        QueuedJob::new(JobSpec::with_options(
            JobData::PollBurns(PollCursor {
                last_cursor: Cursor(cursor),
            }),
            JobOptions::default().with_dedup_key("poll-burns"),
        ))
    }

    #[tokio::test]
    async fn test_held_key_drops_new_submission() {
        let queue = MemoryQueue::new();
        let report = queue
            .enqueue_batch(QueueName::PollBurns, vec![poll(1)])
            .await
            .unwrap();
        assert_eq!(report.accepted, 1);

        let report = queue
            .enqueue_batch(QueueName::PollBurns, vec![poll(2)])
            .await
            .unwrap();
        assert_eq!(report.deduplicated, 1);

        let pending = queue.take(QueueName::PollBurns).await;
        assert_eq!(pending, vec![poll(1)]);
    }

    #[tokio::test]
    async fn test_release_allows_resubmission() {
        let queue = MemoryQueue::new();
        queue
            .enqueue_batch(QueueName::PollBurns, vec![poll(1)])
            .await
            .unwrap();
        queue
            .release_dedup(QueueName::PollBurns, "poll-burns")
            .await
            .unwrap();
        assert!(!queue.is_held(QueueName::PollBurns, "poll-burns").await);

        let report = queue
            .enqueue_batch(QueueName::PollBurns, vec![poll(2)])
            .await
            .unwrap();
        assert_eq!(report.accepted, 1);
    }

    #[tokio::test]
    async fn test_keys_are_scoped_per_queue() {
        let queue = MemoryQueue::new();
        queue
            .enqueue_batch(QueueName::PollBurns, vec![poll(1)])
            .await
            .unwrap();
        assert!(queue.is_held(QueueName::PollBurns, "poll-burns").await);
        assert!(!queue.is_held(QueueName::PollSwaps, "poll-burns").await);
    }

    #[tokio::test]
    async fn test_failed_batch_stores_nothing() {
        let queue = MemoryQueue::new();
        queue.fail_next_batch().await;
        assert!(
            queue
                .enqueue_batch(QueueName::PollBurns, vec![poll(1)])
                .await
                .is_err()
        );
        assert!(queue.batches().await.is_empty());
        assert!(!queue.is_held(QueueName::PollBurns, "poll-burns").await);
    }

    #[tokio::test]
    async fn test_take_leaves_other_queues_pending() {
        let queue = MemoryQueue::new();
        queue
            .enqueue_batch(QueueName::PollBurns, vec![poll(1)])
            .await
            .unwrap();
        let swap = QueuedJob::new(JobSpec::new(JobData::PollSwaps(PollCursor {
            last_cursor: Cursor(7),
        })));
        queue
            .enqueue_batch(QueueName::PollSwaps, vec![swap.clone()])
            .await
            .unwrap();

        assert_eq!(queue.take(QueueName::PollBurns).await, vec![poll(1)]);
        assert!(queue.take(QueueName::PollBurns).await.is_empty());
        assert_eq!(queue.take(QueueName::PollSwaps).await, vec![swap]);
    }

    #[tokio::test]
    async fn test_owned_submission_ignores_held_key() {
        let queue = MemoryQueue::new();
        queue
            .enqueue_batch(QueueName::PollBurns, vec![poll(1)])
            .await
            .unwrap();
        queue.take(QueueName::PollBurns).await;

        let report = queue
            .enqueue_owned(QueueName::PollBurns, vec![poll(2)])
            .await
            .unwrap();
        assert_eq!(report.accepted, 1);
        assert!(queue.is_held(QueueName::PollBurns, "poll-burns").await);
        assert_eq!(queue.take(QueueName::PollBurns).await, vec![poll(2)]);
    }
}
