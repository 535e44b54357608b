//! Chain data source abstraction.
//!
//! Job handlers read indexed on-chain data through [`ChainDataSource`]. The
//! production implementation is [`crate::IndexerClient`]; tests substitute
//! in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_common::AppError;
use thiserror::Error;

use crate::cursor::Cursor;
use crate::events::{Burn, Delegation, DelegationStatus, LiquidityDeposit, Swap, VolumeSummary};

/// Failure reading from the data source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Indexer request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Indexer returned errors: {0}")]
    Query(String),

    #[error("Unexpected indexer response: {0}")]
    InvalidResponse(String),
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        Self::DataSource(err.to_string())
    }
}

/// Read-only queries against the chain indexer.
///
/// Every `*_since` query returns items with ids strictly greater than the
/// cursor, ordered by id ascending.
#[async_trait]
pub trait ChainDataSource: Send + Sync {
    /// Id of the most recent swap.
    async fn latest_swap_id(&self) -> Result<Cursor, SourceError>;

    /// Swaps newer than `cursor`.
    async fn swaps_since(&self, cursor: Cursor) -> Result<Vec<Swap>, SourceError>;

    /// Id of the most recent burn.
    async fn latest_burn_id(&self) -> Result<Cursor, SourceError>;

    /// Burns newer than `cursor`.
    async fn burns_since(&self, cursor: Cursor) -> Result<Vec<Burn>, SourceError>;

    /// Id of the most recent liquidity deposit.
    async fn latest_deposit_id(&self) -> Result<Cursor, SourceError>;

    /// Liquidity deposits newer than `cursor`.
    async fn deposits_since(&self, cursor: Cursor) -> Result<Vec<LiquidityDeposit>, SourceError>;

    /// Id of the most recent delegation change.
    async fn latest_delegation_id(&self) -> Result<Cursor, SourceError>;

    /// Delegation changes newer than `cursor`.
    async fn delegations_since(&self, cursor: Cursor) -> Result<Vec<Delegation>, SourceError>;

    /// Finality of the delegation transaction `tx_hash`.
    async fn delegation_status(&self, tx_hash: &str) -> Result<DelegationStatus, SourceError>;

    /// Aggregated activity over `[start, end)`.
    async fn volume_summary(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<VolumeSummary, SourceError>;
}
