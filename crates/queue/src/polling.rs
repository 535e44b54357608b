//! Cursor-polling state machine.
//!
//! A polling job carries its cursor in its payload. Each run fetches items
//! newer than the cursor and feeds them through [`plan_poll`], which decides
//! the next cursor and which items are fresh enough to announce.

use std::time::Duration;

use chrono::{DateTime, Utc};
use herald_core::Cursor;
use herald_core::events::ChainItem;

/// Outcome of one polling step.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPlan<T> {
    /// Cursor for the rescheduled job.
    pub next_cursor: Cursor,
    /// Items to announce, ascending by id.
    pub fresh: Vec<T>,
    /// Items skipped for being older than the staleness window.
    pub stale_count: usize,
}

/// Plan a polling step from the items returned for cursor `last`.
///
/// Items at or below `last` are ignored. Stale items still advance the
/// cursor.
#[must_use]
pub fn plan_poll<T: ChainItem>(
    last: Cursor,
    items: Vec<T>,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> PollPlan<T> {
    let mut items: Vec<T> = items.into_iter().filter(|i| i.cursor() > last).collect();
    items.sort_by_key(T::cursor);

    let next_cursor = items.last().map_or(last, T::cursor);

    // Future timestamps (clock skew) count as fresh.
    let (fresh, stale): (Vec<T>, Vec<T>) = items.into_iter().partition(|item| {
        now.signed_duration_since(item.timestamp())
            .to_std()
            .map_or(true, |age| age <= stale_after)
    });

    PollPlan {
        next_cursor,
        fresh,
        stale_count: stale.len(),
    }
}
