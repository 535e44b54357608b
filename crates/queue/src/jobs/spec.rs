use std::time::Duration;

use herald_common::config::RetrySettings;
use serde::{Deserialize, Serialize};

use super::{JobData, QueueName};
use crate::retry::{Backoff, opt_millis};

/// Scheduling options of a single job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    /// Wait before the job becomes runnable.
    #[serde(default, with = "opt_millis", skip_serializing_if = "Option::is_none")]
    pub delay: Option<Duration>,
    /// Total attempts, including the first one.
    pub attempts: u32,
    #[serde(default)]
    pub backoff: Backoff,
    /// At most one pending job per key and queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            delay: None,
            attempts: 1,
            backoff: Backoff::default(),
            dedup_key: None,
        }
    }
}

impl JobOptions {
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_dedup_key(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = Some(key.into());
        self
    }
}

impl From<RetrySettings> for JobOptions {
    fn from(settings: RetrySettings) -> Self {
        Self {
            attempts: settings.attempts,
            backoff: settings.into(),
            ..Self::default()
        }
    }
}

/// A job ready to be dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub data: JobData,
    #[serde(default)]
    pub options: JobOptions,
}

impl JobSpec {
    /// A job with default options: one attempt, no delay.
    #[must_use]
    pub fn new(data: JobData) -> Self {
        Self {
            data,
            options: JobOptions::default(),
        }
    }

    #[must_use]
    pub const fn with_options(data: JobData, options: JobOptions) -> Self {
        Self { data, options }
    }

    #[must_use]
    pub const fn queue(&self) -> QueueName {
        self.data.queue()
    }
}

/// Envelope persisted by the queue substrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedJob {
    #[serde(flatten)]
    pub spec: JobSpec,
    /// Failed attempts before this one.
    #[serde(default)]
    pub attempts_made: u32,
}

impl QueuedJob {
    #[must_use]
    pub const fn new(spec: JobSpec) -> Self {
        Self {
            spec,
            attempts_made: 0,
        }
    }

    #[must_use]
    pub const fn queue(&self) -> QueueName {
        self.spec.queue()
    }

    #[must_use]
    pub fn dedup_key(&self) -> Option<&str> {
        self.spec.options.dedup_key.as_deref()
    }

    /// Whether a failure of this attempt may be retried.
    #[must_use]
    pub const fn can_retry(&self) -> bool {
        Backoff::should_retry(self.attempts_made, self.spec.options.attempts)
    }

    /// The next attempt, delayed by the job's backoff.
    #[must_use]
    pub fn next_attempt(&self) -> Self {
        let mut spec = self.spec.clone();
        spec.options.delay = Some(spec.options.backoff.delay_for_attempt(self.attempts_made));
        Self {
            spec,
            attempts_made: self.attempts_made + 1,
        }
    }
}
