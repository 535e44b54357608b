//! Cursor-polling handlers for the swap, burn, liquidity and delegation streams.

use std::time::Duration;

use chrono::Utc;
use herald_common::AppResult;
use herald_common::config::PollingConfig;
use herald_core::{Cursor, NotificationContent};
use tracing::info;

use super::JobContext;
use crate::jobs::{CheckDelegation, JobData, JobSpec, PollCursor, QueueName};
use crate::polling::plan_poll;

/// A cursor-polled stream of on-chain items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Swaps,
    Burns,
    Liquidity,
    Delegations,
}

impl Stream {
    pub const ALL: [Self; 4] = [Self::Swaps, Self::Burns, Self::Liquidity, Self::Delegations];

    #[must_use]
    pub const fn queue(self) -> QueueName {
        match self {
            Self::Swaps => QueueName::PollSwaps,
            Self::Burns => QueueName::PollBurns,
            Self::Liquidity => QueueName::PollLiquidity,
            Self::Delegations => QueueName::PollDelegations,
        }
    }

    /// Dedup key shared by every pending job of this stream.
    #[must_use]
    pub const fn dedup_key(self) -> &'static str {
        self.queue().as_str()
    }

    #[must_use]
    pub const fn interval(self, polling: &PollingConfig) -> Duration {
        match self {
            Self::Swaps => polling.swap_interval(),
            Self::Burns => polling.burn_interval(),
            Self::Liquidity => polling.liquidity_interval(),
            Self::Delegations => polling.delegation_interval(),
        }
    }

    #[must_use]
    pub const fn job_data(self, last_cursor: Cursor) -> JobData {
        let state = PollCursor { last_cursor };
        match self {
            Self::Swaps => JobData::PollSwaps(state),
            Self::Burns => JobData::PollBurns(state),
            Self::Liquidity => JobData::PollLiquidity(state),
            Self::Delegations => JobData::PollDelegations(state),
        }
    }

    /// The next poll of this stream, starting after `last_cursor`.
    #[must_use]
    pub fn job(self, ctx: &JobContext, last_cursor: Cursor, delay: Duration) -> JobSpec {
        JobSpec::with_options(
            self.job_data(last_cursor),
            ctx.config
                .poll_options()
                .with_delay(delay)
                .with_dedup_key(self.dedup_key()),
        )
    }
}

pub(super) async fn swaps(ctx: &JobContext, state: PollCursor) -> AppResult<()> {
    let items = ctx.source.swaps_since(state.last_cursor).await?;
    let plan = plan_poll(state.last_cursor, items, Utc::now(), ctx.config.polling.stale_after());
    log_stale(Stream::Swaps, plan.stale_count);

    let downstream = plan
        .fresh
        .into_iter()
        .flat_map(|swap| ctx.route_jobs(&NotificationContent::Swap(swap)))
        .collect();
    reschedule(ctx, Stream::Swaps, plan.next_cursor, downstream).await
}

pub(super) async fn burns(ctx: &JobContext, state: PollCursor) -> AppResult<()> {
    let items = ctx.source.burns_since(state.last_cursor).await?;
    let plan = plan_poll(state.last_cursor, items, Utc::now(), ctx.config.polling.stale_after());
    log_stale(Stream::Burns, plan.stale_count);

    let downstream = plan
        .fresh
        .into_iter()
        .flat_map(|burn| ctx.route_jobs(&NotificationContent::Burn(burn)))
        .collect();
    reschedule(ctx, Stream::Burns, plan.next_cursor, downstream).await
}

pub(super) async fn liquidity(ctx: &JobContext, state: PollCursor) -> AppResult<()> {
    let items = ctx.source.deposits_since(state.last_cursor).await?;
    let plan = plan_poll(state.last_cursor, items, Utc::now(), ctx.config.polling.stale_after());
    log_stale(Stream::Liquidity, plan.stale_count);

    let downstream = plan
        .fresh
        .into_iter()
        .flat_map(|deposit| ctx.route_jobs(&NotificationContent::Liquidity(deposit)))
        .collect();
    reschedule(ctx, Stream::Liquidity, plan.next_cursor, downstream).await
}

/// Delegations are announced only once final, so each fresh one starts a
/// status check instead of a notification.
pub(super) async fn delegations(ctx: &JobContext, state: PollCursor) -> AppResult<()> {
    let items = ctx.source.delegations_since(state.last_cursor).await?;
    let plan = plan_poll(state.last_cursor, items, Utc::now(), ctx.config.polling.stale_after());
    log_stale(Stream::Delegations, plan.stale_count);

    let downstream = plan
        .fresh
        .into_iter()
        .map(|delegation| {
            super::delegation::check_job(ctx, CheckDelegation { delegation, checks: 0 }, None)
        })
        .collect();
    reschedule(ctx, Stream::Delegations, plan.next_cursor, downstream).await
}

async fn reschedule(
    ctx: &JobContext,
    stream: Stream,
    next_cursor: Cursor,
    downstream: Vec<JobSpec>,
) -> AppResult<()> {
    info!(
        queue = %stream.queue(),
        cursor = %next_cursor,
        downstream = downstream.len(),
        "Polled stream"
    );
    let next = stream.job(ctx, next_cursor, stream.interval(&ctx.config.polling));
    dispatch_poll(ctx, next, downstream).await
}

/// Dispatch the next poll `next` together with `downstream`.
///
/// With nothing to fan out the poll goes straight back to its own queue.
/// Otherwise both travel in one scheduler job, so they are enqueued as a unit.
pub(super) async fn dispatch_poll(
    ctx: &JobContext,
    next: JobSpec,
    downstream: Vec<JobSpec>,
) -> AppResult<()> {
    if downstream.is_empty() {
        return ctx.dispatcher.dispatch(next.queue(), vec![next]).await;
    }

    let mut batch = Vec::with_capacity(downstream.len() + 1);
    batch.push(next);
    batch.extend(downstream);
    ctx.dispatcher
        .dispatch(
            QueueName::Scheduler,
            vec![JobSpec::with_options(
                JobData::Scheduler(batch),
                ctx.config.route_options(),
            )],
        )
        .await
}

fn log_stale(stream: Stream, count: usize) {
    if count > 0 {
        info!(queue = %stream.queue(), skipped = count, "Skipping stale items");
    }
}
