//! Metrics collection for herald.
//!
//! Counters for job execution and notification delivery. One instance is
//! created by the server and shared with workers and the HTTP layer.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Application metrics collector.
#[derive(Debug, Default)]
pub struct Metrics {
    // === Job Queue Metrics ===
    /// Jobs enqueued
    pub jobs_enqueued: AtomicU64,
    /// Jobs dropped because a job with the same dedup key was pending
    pub jobs_deduplicated: AtomicU64,
    /// Jobs completed
    pub jobs_completed: AtomicU64,
    /// Jobs failed (including those rescheduled for retry)
    pub jobs_failed: AtomicU64,
    /// Jobs rescheduled for another attempt
    pub jobs_retried: AtomicU64,
    /// Jobs aborted without retry
    pub jobs_aborted: AtomicU64,

    // === Delivery Metrics ===
    /// Messages accepted by a platform
    pub notifications_delivered: AtomicU64,
    /// Platform delivery failures
    pub delivery_failures: AtomicU64,
    /// Deliveries rejected by a platform rate limit
    pub delivery_rate_limited: AtomicU64,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub jobs_enqueued: u64,
    pub jobs_deduplicated: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_retried: u64,
    pub jobs_aborted: u64,
    pub notifications_delivered: u64,
    pub delivery_failures: u64,
    pub delivery_rate_limited: u64,
}

impl Metrics {
    /// Create a new metrics instance with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            jobs_enqueued: AtomicU64::new(0),
            jobs_deduplicated: AtomicU64::new(0),
            jobs_completed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            jobs_retried: AtomicU64::new(0),
            jobs_aborted: AtomicU64::new(0),
            notifications_delivered: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            delivery_rate_limited: AtomicU64::new(0),
        }
    }

    /// Record jobs handed to the queue substrate.
    pub fn record_enqueued(&self, accepted: u64, deduplicated: u64) {
        self.jobs_enqueued.fetch_add(accepted, Ordering::Relaxed);
        self.jobs_deduplicated
            .fetch_add(deduplicated, Ordering::Relaxed);
    }

    /// Record a finished job execution.
    pub fn record_job_completed(&self) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed job execution and whether another attempt was scheduled.
    pub fn record_job_failed(&self, retried: bool) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        if retried {
            self.jobs_retried.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a job aborted without retry.
    pub fn record_job_aborted(&self) {
        self.jobs_aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a platform delivery outcome.
    pub fn record_delivery(&self, success: bool) {
        if success {
            self.notifications_delivered
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.delivery_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a delivery rejected by a platform rate limit.
    pub fn record_rate_limited(&self) {
        self.delivery_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_enqueued: self.jobs_enqueued.load(Ordering::Relaxed),
            jobs_deduplicated: self.jobs_deduplicated.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_retried: self.jobs_retried.load(Ordering::Relaxed),
            jobs_aborted: self.jobs_aborted.load(Ordering::Relaxed),
            notifications_delivered: self.notifications_delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            delivery_rate_limited: self.delivery_rate_limited.load(Ordering::Relaxed),
        }
    }
}
