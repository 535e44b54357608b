//! Periodic volume summary.
//!
//! The cursor is the end of the last summarized period, in unix seconds.
//! Each run either reschedules itself until the next period completes, or
//! advances the cursor by exactly one period.

use std::time::Duration;

use chrono::{DateTime, Utc};
use herald_common::{AppError, AppResult};
use herald_core::NotificationContent;
use tracing::info;

use super::JobContext;
use super::poll::dispatch_poll;
use crate::jobs::{JobData, JobSpec, PollVolumeSummary, QueueName};

const MIN_DELAY: Duration = Duration::from_secs(1);

/// Start of the period containing `now`, with periods aligned to the epoch.
#[must_use]
pub fn period_boundary(now: i64, period_secs: i64) -> i64 {
    if period_secs <= 0 {
        return now;
    }
    now.div_euclid(period_secs) * period_secs
}

/// Wait from `now` until `at`, never shorter than [`MIN_DELAY`].
fn delay_until(now: i64, at: i64) -> Duration {
    u64::try_from(at.saturating_sub(now))
        .map(Duration::from_secs)
        .unwrap_or_default()
        .max(MIN_DELAY)
}

fn timestamp(secs: i64) -> AppResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| AppError::Invariant(format!("period boundary {secs} out of range")))
}

pub(crate) fn volume_job(ctx: &JobContext, last_period_end: i64, delay: Duration) -> JobSpec {
    JobSpec::with_options(
        JobData::PollVolumeSummary(PollVolumeSummary { last_period_end }),
        ctx.config
            .poll_options()
            .with_delay(delay)
            .with_dedup_key(QueueName::PollVolumeSummary.as_str()),
    )
}

pub(super) async fn poll(ctx: &JobContext, state: PollVolumeSummary) -> AppResult<()> {
    let polling = &ctx.config.polling;
    let period = i64::try_from(polling.volume_period_secs.max(1)).unwrap_or(i64::MAX);
    let stale_after = i64::try_from(polling.stale_after_secs).unwrap_or(i64::MAX);
    let now = Utc::now().timestamp();

    let start = state.last_period_end;
    let end = start.saturating_add(period);

    if now < end {
        let next = volume_job(ctx, start, delay_until(now, end));
        return ctx
            .dispatcher
            .dispatch(QueueName::PollVolumeSummary, vec![next])
            .await;
    }

    let next = volume_job(ctx, end, delay_until(now, end.saturating_add(period)));

    if now - end > stale_after {
        info!(period_end = end, "Skipping stale volume summary");
        return dispatch_poll(ctx, next, Vec::new()).await;
    }

    let summary = ctx.source.volume_summary(timestamp(start)?, timestamp(end)?).await?;
    info!(
        period_end = end,
        volume_usd = summary.volume_usd,
        swaps = summary.swap_count,
        "Volume summary ready"
    );
    let downstream = ctx.route_jobs(&NotificationContent::VolumeSummary(summary));
    dispatch_poll(ctx, next, downstream).await
}
