//! On-chain records and the notification content built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::filter::MessageClass;

/// An indexed on-chain item that a polling stream walks over by id.
pub trait ChainItem {
    /// Position of the item in its stream.
    fn cursor(&self) -> Cursor;

    /// Block timestamp of the item.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// A token swap on the tracked pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swap {
    pub id: Cursor,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: String,
    pub trader: String,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: f64,
    pub amount_out: f64,
    pub usd_value: f64,
}

/// A token burn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Burn {
    pub id: Cursor,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: String,
    pub burner: String,
    pub token: String,
    pub amount: f64,
    pub usd_value: f64,
}

/// A liquidity deposit into a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityDeposit {
    pub id: Cursor,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: String,
    pub provider: String,
    pub pool: String,
    pub token_a: String,
    pub token_b: String,
    pub amount_a: f64,
    pub amount_b: f64,
    pub usd_value: f64,
}

/// Direction of a delegation change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelegationKind {
    Delegate,
    Undelegate,
}

/// Stake delegated to (or withdrawn from) a validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegation {
    pub id: Cursor,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: String,
    pub delegator: String,
    pub validator: String,
    pub amount: f64,
    pub kind: DelegationKind,
}

/// Finality of a delegation transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelegationStatus {
    Pending,
    Finalized,
    Failed,
}

/// Aggregated activity over one summary period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSummary {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub volume_usd: f64,
    pub swap_count: u64,
    pub unique_traders: u64,
    pub burned_usd: f64,
}

macro_rules! chain_item {
    ($($ty:ty),+) => {
        $(
            impl ChainItem for $ty {
                fn cursor(&self) -> Cursor {
                    self.id
                }

                fn timestamp(&self) -> DateTime<Utc> {
                    self.timestamp
                }
            }
        )+
    };
}

chain_item!(Swap, Burn, LiquidityDeposit, Delegation);

/// Platform-agnostic content of one notification.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationContent {
    Swap(Swap),
    Burn(Burn),
    Liquidity(LiquidityDeposit),
    Delegation(Delegation),
    VolumeSummary(VolumeSummary),
}

impl NotificationContent {
    /// Message class used by destination filters.
    #[must_use]
    pub const fn class(&self) -> MessageClass {
        match self {
            Self::Swap(_) => MessageClass::NewSwap,
            Self::Burn(_) => MessageClass::NewBurn,
            Self::Liquidity(_) => MessageClass::NewLiquidity,
            Self::Delegation(_) => MessageClass::NewDelegation,
            Self::VolumeSummary(_) => MessageClass::VolumeSummary,
        }
    }

    /// Numeric value compared against filter thresholds.
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        match self {
            Self::Swap(s) => Some(s.usd_value),
            Self::Burn(b) => Some(b.usd_value),
            Self::Liquidity(l) => Some(l.usd_value),
            Self::Delegation(d) => Some(d.amount),
            Self::VolumeSummary(v) => Some(v.volume_usd),
        }
    }
}
