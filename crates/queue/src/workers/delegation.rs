//! Finality checks of detected delegations.

use std::time::Duration;

use herald_common::{AppError, AppResult};
use herald_core::{DelegationStatus, NotificationContent};
use tracing::{debug, info};

use super::JobContext;
use crate::jobs::{CheckDelegation, JobData, JobSpec, QueueName};

pub(super) fn check_job(
    ctx: &JobContext,
    check: CheckDelegation,
    delay: Option<Duration>,
) -> JobSpec {
    let key = format!("check-delegation-{}", check.delegation.id);
    let mut options = ctx.config.poll_options().with_dedup_key(key);
    options.delay = delay;
    JobSpec::with_options(JobData::CheckDelegation(check), options)
}

pub(super) async fn check(ctx: &JobContext, check: CheckDelegation) -> AppResult<()> {
    let delegation = &check.delegation;
    let status = ctx.source.delegation_status(&delegation.tx_hash).await?;

    match status {
        DelegationStatus::Finalized => {
            info!(id = %delegation.id, "Delegation finalized");
            let jobs = ctx.route_jobs(&NotificationContent::Delegation(check.delegation));
            ctx.dispatcher.dispatch(QueueName::MessageRouter, jobs).await
        }
        DelegationStatus::Failed => {
            info!(id = %delegation.id, tx_hash = %delegation.tx_hash, "Delegation failed on chain");
            Ok(())
        }
        DelegationStatus::Pending => {
            let checks = check.checks + 1;
            if checks >= ctx.config.polling.max_status_checks {
                return Err(AppError::Invariant(format!(
                    "no finalized delegation {} after {checks} checks",
                    delegation.id
                )));
            }
            debug!(id = %delegation.id, checks, "Delegation still pending");
            let next = check_job(
                ctx,
                CheckDelegation {
                    delegation: check.delegation,
                    checks,
                },
                Some(ctx.config.polling.status_check_interval()),
            );
            ctx.dispatcher.dispatch(QueueName::CheckDelegation, vec![next]).await
        }
    }
}
