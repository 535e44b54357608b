//! Fan-out of a rendered notification to one platform's destinations.

use herald_common::AppResult;
use herald_core::NotificationEvent;
use tracing::info;

use super::JobContext;
use crate::jobs::{JobData, JobSpec, QueueName, RouteMessage, SendMessage};

pub(super) async fn route(ctx: &JobContext, message: RouteMessage) -> AppResult<()> {
    let event = NotificationEvent::new(message.class, message.value);

    let batch: Vec<JobSpec> = ctx
        .registry
        .for_platform(message.platform)
        .filter(|destination| destination.accepts(&event))
        .map(|destination| {
            JobSpec::with_options(
                JobData::SendMessage(SendMessage {
                    destination_key: destination.key.clone(),
                    text: message.text.clone(),
                    reply_to: None,
                }),
                ctx.config.send_options(),
            )
        })
        .collect();

    info!(
        platform = %message.platform,
        class = %message.class,
        count = batch.len(),
        "Routing notification"
    );
    ctx.dispatcher.dispatch(QueueName::SendMessage, batch).await
}
