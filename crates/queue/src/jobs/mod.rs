//! Job definitions.
//!
//! [`JobData`] is the registry of job types: one variant per queue, each with
//! exactly one payload type. The queue a job belongs to is derived from its
//! variant, never stored separately.

#![allow(missing_docs)]

mod payload;
mod spec;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use payload::{CheckDelegation, PollCursor, PollVolumeSummary, RouteMessage, SendMessage};
pub use spec::{JobOptions, JobSpec, QueuedJob};

/// A named job queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueName {
    PollSwaps,
    PollBurns,
    PollLiquidity,
    PollDelegations,
    PollVolumeSummary,
    CheckDelegation,
    Scheduler,
    MessageRouter,
    SendMessage,
}

impl QueueName {
    pub const ALL: [Self; 9] = [
        Self::PollSwaps,
        Self::PollBurns,
        Self::PollLiquidity,
        Self::PollDelegations,
        Self::PollVolumeSummary,
        Self::CheckDelegation,
        Self::Scheduler,
        Self::MessageRouter,
        Self::SendMessage,
    ];

    /// Stable wire name, used for storage namespaces and worker names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PollSwaps => "poll-swaps",
            Self::PollBurns => "poll-burns",
            Self::PollLiquidity => "poll-liquidity",
            Self::PollDelegations => "poll-delegations",
            Self::PollVolumeSummary => "poll-volume-summary",
            Self::CheckDelegation => "check-delegation",
            Self::Scheduler => "scheduler",
            Self::MessageRouter => "message-router",
            Self::SendMessage => "send-message",
        }
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| format!("unknown queue: {s}"))
    }
}

/// Payload of a job, tagged with the queue it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "queue", content = "payload", rename_all = "kebab-case")]
pub enum JobData {
    PollSwaps(PollCursor),
    PollBurns(PollCursor),
    PollLiquidity(PollCursor),
    PollDelegations(PollCursor),
    PollVolumeSummary(PollVolumeSummary),
    CheckDelegation(CheckDelegation),
    /// Jobs to forward, in order.
    Scheduler(Vec<JobSpec>),
    MessageRouter(RouteMessage),
    SendMessage(SendMessage),
}

impl JobData {
    #[must_use]
    pub const fn queue(&self) -> QueueName {
        match self {
            Self::PollSwaps(_) => QueueName::PollSwaps,
            Self::PollBurns(_) => QueueName::PollBurns,
            Self::PollLiquidity(_) => QueueName::PollLiquidity,
            Self::PollDelegations(_) => QueueName::PollDelegations,
            Self::PollVolumeSummary(_) => QueueName::PollVolumeSummary,
            Self::CheckDelegation(_) => QueueName::CheckDelegation,
            Self::Scheduler(_) => QueueName::Scheduler,
            Self::MessageRouter(_) => QueueName::MessageRouter,
            Self::SendMessage(_) => QueueName::SendMessage,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use herald_core::Cursor;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_queue_names_round_trip_through_from_str() {
        for queue in QueueName::ALL {
            assert_eq!(queue.as_str().parse::<QueueName>().unwrap(), queue);
            assert_eq!(
                serde_json::to_value(queue).unwrap(),
                json!(queue.as_str())
            );
        }
        assert!("poll-everything".parse::<QueueName>().is_err());
    }

    #[test]
    fn test_job_data_wire_format() {
        let data = JobData::PollBurns(PollCursor {
            last_cursor: Cursor(10),
        });
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(
            value,
            json!({ "queue": "poll-burns", "payload": { "lastCursor": 10 } })
        );
        assert_eq!(data.queue(), QueueName::PollBurns);
    }

    #[test]
    fn test_payload_must_match_queue() {
        let mismatched = json!({ "queue": "send-message", "payload": { "lastCursor": 10 } });
        assert!(serde_json::from_value::<JobData>(mismatched).is_err());
    }

    #[test]
    fn test_scheduler_nests_specs() {
        let inner = JobSpec::new(JobData::PollSwaps(PollCursor {
            last_cursor: Cursor(3),
        }));
        let data = JobData::Scheduler(vec![inner.clone()]);
        let parsed: JobData =
            serde_json::from_value(serde_json::to_value(&data).unwrap()).unwrap();
        assert_eq!(parsed, JobData::Scheduler(vec![inner]));
    }
}
