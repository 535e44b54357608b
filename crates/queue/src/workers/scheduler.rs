//! Batch forwarding.

use herald_common::AppResult;

use super::JobContext;
use crate::jobs::{JobSpec, QueueName};

/// Split `jobs` into maximal consecutive runs that share a queue.
#[must_use]
pub fn group_runs(jobs: Vec<JobSpec>) -> Vec<(QueueName, Vec<JobSpec>)> {
    let mut runs: Vec<(QueueName, Vec<JobSpec>)> = Vec::new();
    for job in jobs {
        let queue = job.queue();
        match runs.last_mut() {
            Some((last, run)) if *last == queue => run.push(job),
            _ => runs.push((queue, vec![job])),
        }
    }
    runs
}

/// Re-dispatch `jobs` run by run, in list order.
pub(super) async fn forward(ctx: &JobContext, jobs: Vec<JobSpec>) -> AppResult<()> {
    for (queue, run) in group_runs(jobs) {
        ctx.dispatcher.dispatch(queue, run).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use herald_core::{Cursor, MessageClass, Platform};

    use super::*;
    use crate::jobs::{JobData, PollCursor, RouteMessage};

    fn poll() -> JobSpec {
        JobSpec::new(JobData::PollBurns(PollCursor {
            last_cursor: Cursor(11),
        }))
    }

    fn route(platform: Platform) -> JobSpec {
        JobSpec::new(JobData::MessageRouter(RouteMessage {
            platform,
            class: MessageClass::NewBurn,
            value: Some(4.21),
            text: "burn".into(),
        }))
    }

    #[test]
    fn test_empty_list_has_no_runs() {
        assert!(group_runs(Vec::new()).is_empty());
    }

    #[test]
    fn test_consecutive_entries_share_a_run() {
        let runs = group_runs(vec![
            poll(),
            route(Platform::Discord),
            route(Platform::Telegram),
            route(Platform::Twitter),
        ]);
        let shape: Vec<_> = runs.iter().map(|(q, jobs)| (*q, jobs.len())).collect();
        assert_eq!(
            shape,
            vec![(QueueName::PollBurns, 1), (QueueName::MessageRouter, 3)]
        );
    }

    #[test]
    fn test_interleaved_queues_keep_list_order() {
        let runs = group_runs(vec![
            route(Platform::Discord),
            poll(),
            route(Platform::Telegram),
        ]);
        let queues: Vec<_> = runs.iter().map(|(q, _)| *q).collect();
        assert_eq!(
            queues,
            vec![
                QueueName::MessageRouter,
                QueueName::PollBurns,
                QueueName::MessageRouter
            ]
        );
        let JobData::MessageRouter(first) = &runs[0].1[0].data else {
            panic!("expected a router job");
        };
        assert_eq!(first.platform, Platform::Discord);
    }
}
