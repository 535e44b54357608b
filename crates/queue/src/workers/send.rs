//! Delivery of one message to one destination.

use herald_common::AppResult;
use herald_core::DeliveryError;
use herald_core::chunk::split_message;
use tracing::{info, warn};

use super::JobContext;
use crate::jobs::{JobData, JobSpec, QueueName, SendMessage};

/// Send `message`, cutting it to the platform's length ceiling.
///
/// Text past the ceiling is dispatched as a new job threaded under the
/// message just sent, so every chunk is retried on its own. Once the head is
/// delivered the job succeeds: a continuation the queue refuses is held for
/// redelivery, never re-sent along with the head.
pub(super) async fn send(ctx: &JobContext, message: SendMessage) -> AppResult<()> {
    let destination = ctx.registry.get(&message.destination_key)?;
    let client = ctx.clients.for_platform(destination.platform());

    let (head, rest) = match client.max_message_length() {
        Some(max) => split_message(&message.text, max),
        None => (message.text.clone(), None),
    };

    let sent = match client
        .send(&destination.credentials, &head, message.reply_to.as_deref())
        .await
    {
        Ok(sent) => {
            ctx.metrics.record_delivery(true);
            sent
        }
        Err(e) => {
            if matches!(e, DeliveryError::RateLimited { .. }) {
                ctx.metrics.record_rate_limited();
            } else {
                ctx.metrics.record_delivery(false);
            }
            warn!(destination = %destination.key, error = %e, "Delivery failed");
            return Err(e.into());
        }
    };

    info!(
        destination = %destination.key,
        message_id = %sent.id,
        continued = rest.is_some(),
        "Message delivered"
    );

    let Some(rest) = rest else {
        return Ok(());
    };
    let continuation = JobSpec::with_options(
        JobData::SendMessage(SendMessage {
            destination_key: message.destination_key,
            text: rest,
            reply_to: Some(sent.id),
        }),
        ctx.config.send_options(),
    );
    ctx.dispatcher
        .dispatch_or_hold(QueueName::SendMessage, vec![continuation])
        .await
}
