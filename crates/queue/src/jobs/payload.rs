use herald_core::{Cursor, Delegation, MessageClass, Platform};
use serde::{Deserialize, Serialize};

/// State of a cursor-polling stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollCursor {
    /// Highest id already handled.
    pub last_cursor: Cursor,
}

/// State of the periodic volume summary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollVolumeSummary {
    /// Unix seconds at which the last announced period ended.
    pub last_period_end: i64,
}

/// Finality check of a detected delegation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckDelegation {
    pub delegation: Delegation,
    /// Checks already performed.
    #[serde(default)]
    pub checks: u32,
}

/// Rendered notification to fan out to one platform's destinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMessage {
    pub platform: Platform,
    pub class: MessageClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    pub text: String,
}

/// Delivery of text to a single destination.
///
/// Only the destination key crosses into the queue; credentials are
/// resolved by the handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub destination_key: String,
    pub text: String,
    /// Message id to thread this one under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}
