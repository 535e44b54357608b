//! Startup seeding of the polling streams.

use std::time::Duration;

use chrono::Utc;
use herald_common::AppResult;
use herald_core::Cursor;
use tracing::info;

use crate::jobs::QueueName;
use crate::workers::{JobContext, Stream, period_boundary, volume_job};

/// Current head of `stream`.
async fn latest(ctx: &JobContext, stream: Stream) -> AppResult<Cursor> {
    let cursor = match stream {
        Stream::Swaps => ctx.source.latest_swap_id().await?,
        Stream::Burns => ctx.source.latest_burn_id().await?,
        Stream::Liquidity => ctx.source.latest_deposit_id().await?,
        Stream::Delegations => ctx.source.latest_delegation_id().await?,
    };
    Ok(cursor)
}

/// Dispatch the first poll of every stream, starting from its current head.
///
/// Streams that already have a pending poll keep it: the new submission
/// shares its dedup key and is dropped.
///
/// # Errors
/// Returns the first data source or queue error. Startup should abort on it.
pub async fn bootstrap(ctx: &JobContext) -> AppResult<()> {
    for stream in Stream::ALL {
        let cursor = latest(ctx, stream).await?;
        info!(queue = %stream.queue(), cursor = %cursor, "Seeding stream");
        ctx.dispatcher
            .dispatch(stream.queue(), vec![stream.job(ctx, cursor, Duration::ZERO)])
            .await?;
    }

    let period = i64::try_from(ctx.config.polling.volume_period_secs).unwrap_or(i64::MAX);
    let boundary = period_boundary(Utc::now().timestamp(), period);
    info!(queue = %QueueName::PollVolumeSummary, period_end = boundary, "Seeding stream");
    ctx.dispatcher
        .dispatch(
            QueueName::PollVolumeSummary,
            vec![volume_job(ctx, boundary, Duration::ZERO)],
        )
        .await
}
