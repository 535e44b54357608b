//! Per-destination message filters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Class of a notification, matched against destination filter rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageClass {
    NewSwap,
    NewBurn,
    NewLiquidity,
    NewDelegation,
    VolumeSummary,
}

impl MessageClass {
    /// Wire name of the class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewSwap => "NEW_SWAP",
            Self::NewBurn => "NEW_BURN",
            Self::NewLiquidity => "NEW_LIQUIDITY",
            Self::NewDelegation => "NEW_DELEGATION",
            Self::VolumeSummary => "VOLUME_SUMMARY",
        }
    }
}

impl fmt::Display for MessageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a destination's filter list.
///
/// ```json
/// [{ "name": "NEW_SWAP", "minUsdValue": 250 }, { "name": "NEW_BURN" }]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterRule {
    NewSwap {
        #[serde(default, rename = "minUsdValue", skip_serializing_if = "Option::is_none")]
        min_usd_value: Option<f64>,
    },
    NewBurn,
    NewLiquidity,
    NewDelegation,
    VolumeSummary,
}

impl FilterRule {
    /// Class this rule admits.
    #[must_use]
    pub const fn class(&self) -> MessageClass {
        match self {
            Self::NewSwap { .. } => MessageClass::NewSwap,
            Self::NewBurn => MessageClass::NewBurn,
            Self::NewLiquidity => MessageClass::NewLiquidity,
            Self::NewDelegation => MessageClass::NewDelegation,
            Self::VolumeSummary => MessageClass::VolumeSummary,
        }
    }

    /// Minimum event value, if the rule carries one.
    #[must_use]
    pub const fn threshold(&self) -> Option<f64> {
        match self {
            Self::NewSwap { min_usd_value } => *min_usd_value,
            _ => None,
        }
    }
}

/// What the filter engine needs to know about a candidate notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotificationEvent {
    pub class: MessageClass,
    pub value: Option<f64>,
}

impl NotificationEvent {
    #[must_use]
    pub const fn new(class: MessageClass, value: Option<f64>) -> Self {
        Self { class, value }
    }
}

/// Whether a destination with `filters` accepts `event`.
///
/// No filter list accepts everything. Otherwise the first rule of the event's
/// class decides; a threshold on that rule must be met by the event value.
#[must_use]
pub fn can_send(filters: Option<&[FilterRule]>, event: &NotificationEvent) -> bool {
    let Some(filters) = filters else {
        return true;
    };

    let Some(rule) = filters.iter().find(|rule| rule.class() == event.class) else {
        return false;
    };

    match (rule.threshold(), event.value) {
        (None, _) => true,
        (Some(min), Some(value)) => value >= min,
        (Some(_), None) => false,
    }
}
