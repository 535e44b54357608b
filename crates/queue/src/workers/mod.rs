//! Job workers.
//!
//! Every queue is served by [`job_worker`], which heartbeats, frees the job's
//! dedup key, runs the handler for the job's payload and applies the job's
//! retry policy to the outcome.

mod delegation;
mod poll;
mod router;
mod scheduler;
mod send;
mod volume;

use std::sync::Arc;

use apalis::prelude::{Data, Error};
use herald_common::config::{JobsConfig, PollingConfig};
use herald_common::{AppError, AppResult, LivenessMonitor, Metrics, Settings};
use herald_core::render::render;
use herald_core::{
    ChainDataSource, DestinationRegistry, NotificationContent, Platform, PlatformClients,
};
use tracing::{debug, error, warn};

use crate::dispatcher::{Dispatcher, Requeue};
use crate::jobs::{JobData, JobOptions, JobSpec, QueuedJob, RouteMessage};

pub use poll::Stream;
pub use scheduler::group_runs;
pub use volume::period_boundary;
pub(crate) use volume::volume_job;

/// Handler tuning taken from [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct WorkerConfig {
    pub polling: PollingConfig,
    pub jobs: JobsConfig,
    /// Block explorer base URL for transaction links.
    pub explorer_url: String,
}

impl WorkerConfig {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            polling: settings.polling.clone(),
            jobs: settings.jobs.clone(),
            explorer_url: settings.explorer_url.clone(),
        }
    }

    /// Options of a router or scheduler job.
    #[must_use]
    pub fn route_options(&self) -> JobOptions {
        self.jobs.route.into()
    }

    /// Options of a delivery job.
    #[must_use]
    pub fn send_options(&self) -> JobOptions {
        self.jobs.send.into()
    }

    /// Options of a polling or status check job.
    #[must_use]
    pub fn poll_options(&self) -> JobOptions {
        self.jobs.poll.into()
    }
}

/// Shared state handed to every worker.
#[derive(Clone)]
pub struct JobContext {
    pub dispatcher: Dispatcher,
    pub source: Arc<dyn ChainDataSource>,
    pub registry: Arc<DestinationRegistry>,
    pub clients: PlatformClients,
    pub config: Arc<WorkerConfig>,
    pub liveness: Arc<LivenessMonitor>,
    pub metrics: Arc<Metrics>,
}

impl JobContext {
    /// One router job per platform, each with text rendered for that platform.
    pub(crate) fn route_jobs(&self, content: &NotificationContent) -> Vec<JobSpec> {
        Platform::ALL
            .into_iter()
            .map(|platform| {
                let message = RouteMessage {
                    platform,
                    class: content.class(),
                    value: content.value(),
                    text: render(platform, content, &self.config.explorer_url),
                };
                JobSpec::with_options(JobData::MessageRouter(message), self.config.route_options())
            })
            .collect()
    }
}

/// apalis entry point shared by every queue.
///
/// # Errors
/// Returns [`Error::Abort`] whenever the handler fails. Retries are scheduled
/// here as new jobs, so the substrate must never re-run a failed execution.
pub async fn job_worker(job: QueuedJob, ctx: Data<JobContext>) -> Result<(), Error> {
    execute(&ctx, job).await
}

/// Run one job and apply its retry policy.
///
/// # Errors
/// Returns [`Error::Abort`] carrying the handler's error when the job fails.
pub async fn execute(ctx: &JobContext, job: QueuedJob) -> Result<(), Error> {
    ctx.liveness.beat();
    let queue = job.queue();
    debug!(queue = %queue, attempt = job.attempts_made + 1, "Running job");

    // A key that could not be freed is still ours, and the retry keeps it.
    let (owns_key, result) = match job.dedup_key() {
        Some(key) => match ctx.dispatcher.release_dedup(queue, key).await {
            Ok(()) => (false, run_job(ctx, job.spec.data.clone()).await),
            Err(e) => (true, Err(e)),
        },
        None => (false, run_job(ctx, job.spec.data.clone()).await),
    };

    let Err(e) = result else {
        ctx.metrics.record_job_completed();
        return Ok(());
    };

    if !e.is_retryable() {
        error!(queue = %queue, code = e.error_code(), error = %e, "Job aborted");
        ctx.metrics.record_job_aborted();
        return Err(abort(e));
    }

    if !job.can_retry() {
        error!(
            queue = %queue,
            attempts = job.spec.options.attempts,
            code = e.error_code(),
            error = %e,
            "Job failed, attempts exhausted"
        );
        ctx.metrics.record_job_failed(false);
        return Err(abort(e));
    }

    let retry = job.next_attempt();
    warn!(
        queue = %queue,
        attempt = retry.attempts_made + 1,
        delay_secs = retry.spec.options.delay.unwrap_or_default().as_secs_f64(),
        code = e.error_code(),
        error = %e,
        "Job failed, scheduling retry"
    );
    match ctx.dispatcher.requeue(retry, owns_key).await {
        Ok(Requeue::Scheduled) => ctx.metrics.record_job_failed(true),
        Ok(Requeue::Superseded) => {
            warn!(queue = %queue, "Pending job holds the dedup key, retry dropped");
            ctx.metrics.record_job_failed(false);
        }
        Err(requeue) => {
            error!(queue = %queue, error = %requeue, "Failed to schedule retry, holding it");
            ctx.metrics.record_job_failed(true);
        }
    }
    Err(abort(e))
}

/// Run the handler for `data`.
///
/// # Errors
/// Propagates the handler's error unchanged.
pub async fn run_job(ctx: &JobContext, data: JobData) -> AppResult<()> {
    match data {
        JobData::PollSwaps(state) => poll::swaps(ctx, state).await,
        JobData::PollBurns(state) => poll::burns(ctx, state).await,
        JobData::PollLiquidity(state) => poll::liquidity(ctx, state).await,
        JobData::PollDelegations(state) => poll::delegations(ctx, state).await,
        JobData::PollVolumeSummary(state) => volume::poll(ctx, state).await,
        JobData::CheckDelegation(check) => delegation::check(ctx, check).await,
        JobData::Scheduler(jobs) => scheduler::forward(ctx, jobs).await,
        JobData::MessageRouter(message) => router::route(ctx, message).await,
        JobData::SendMessage(message) => send::send(ctx, message).await,
    }
}

fn abort(err: AppError) -> Error {
    let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
    Error::Abort(Arc::new(boxed))
}
