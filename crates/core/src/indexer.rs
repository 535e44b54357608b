//! GraphQL indexer client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use tracing::debug;

use crate::cursor::Cursor;
use crate::events::{
    Burn, Delegation, DelegationKind, DelegationStatus, LiquidityDeposit, Swap, VolumeSummary,
};
use crate::source::{ChainDataSource, SourceError};

const SWAPS_QUERY: &str = r"
query Swaps($cursor: BigInt!, $first: Int!) {
  swaps(where: { index_gt: $cursor }, orderBy: index, orderDirection: asc, first: $first) {
    index timestamp transaction sender tokenIn tokenOut amountIn amountOut amountUSD
  }
}";

const BURNS_QUERY: &str = r"
query Burns($cursor: BigInt!, $first: Int!) {
  burns(where: { index_gt: $cursor }, orderBy: index, orderDirection: asc, first: $first) {
    index timestamp transaction sender token amount amountUSD
  }
}";

const DEPOSITS_QUERY: &str = r"
query Deposits($cursor: BigInt!, $first: Int!) {
  deposits(where: { index_gt: $cursor }, orderBy: index, orderDirection: asc, first: $first) {
    index timestamp transaction provider pool token0 token1 amount0 amount1 amountUSD
  }
}";

const DELEGATIONS_QUERY: &str = r"
query Delegations($cursor: BigInt!, $first: Int!) {
  delegations(where: { index_gt: $cursor }, orderBy: index, orderDirection: asc, first: $first) {
    index timestamp transaction delegator validator amount kind
  }
}";

const LATEST_QUERY: &str = r"
query Latest {
  swaps(orderBy: index, orderDirection: desc, first: 1) { index }
  burns(orderBy: index, orderDirection: desc, first: 1) { index }
  deposits(orderBy: index, orderDirection: desc, first: 1) { index }
  delegations(orderBy: index, orderDirection: desc, first: 1) { index }
}";

const TRANSACTION_QUERY: &str = r"
query Transaction($hash: ID!) {
  transaction(id: $hash) { status }
}";

const DAY_DATA_QUERY: &str = r"
query DayData($start: Int!, $end: Int!) {
  dayDatas(where: { date_gte: $start, date_lt: $end }, orderBy: date, orderDirection: asc) {
    date volumeUSD txCount uniqueTraders burnedUSD
  }
}";

/// [`ChainDataSource`] backed by a GraphQL indexer endpoint.
#[derive(Clone)]
pub struct IndexerClient {
    http: Client,
    url: String,
    page_size: u32,
}

impl IndexerClient {
    /// Create a client for the GraphQL endpoint at `url`.
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        page_size: u32,
    ) -> Result<Self, SourceError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
            page_size,
        })
    }

    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, SourceError> {
        #[derive(Deserialize)]
        struct GraphQlError {
            message: String,
        }

        #[derive(Deserialize)]
        struct Response<T> {
            data: Option<T>,
            #[serde(default)]
            errors: Vec<GraphQlError>,
        }

        let response = self
            .http
            .post(&self.url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?;

        let body: Response<T> = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        if !body.errors.is_empty() {
            let messages: Vec<_> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(SourceError::Query(messages.join("; ")));
        }

        body.data
            .ok_or_else(|| SourceError::InvalidResponse("response has no data".to_string()))
    }

    async fn page<R: DeserializeOwned>(
        &self,
        query: &str,
        field: &str,
        cursor: Cursor,
    ) -> Result<Vec<R>, SourceError> {
        let mut data: Value = self
            .query(
                query,
                json!({ "cursor": cursor.to_string(), "first": self.page_size }),
            )
            .await?;
        let rows = data.get_mut(field).map(Value::take).unwrap_or(Value::Null);
        let rows: Vec<R> = serde_json::from_value(rows)
            .map_err(|e| SourceError::InvalidResponse(format!("{field}: {e}")))?;
        debug!(field, after = %cursor, count = rows.len(), "Fetched indexer page");
        Ok(rows)
    }

    async fn latest(&self, field: &str) -> Result<Cursor, SourceError> {
        #[derive(Deserialize)]
        struct Row {
            index: Cursor,
        }

        let mut data: Value = self.query(LATEST_QUERY, json!({})).await?;
        let rows = data.get_mut(field).map(Value::take).unwrap_or(Value::Null);
        let rows: Vec<Row> = serde_json::from_value(rows)
            .map_err(|e| SourceError::InvalidResponse(format!("{field}: {e}")))?;
        Ok(rows.first().map(|r| r.index).unwrap_or_default())
    }
}

#[async_trait]
impl ChainDataSource for IndexerClient {
    async fn latest_swap_id(&self) -> Result<Cursor, SourceError> {
        self.latest("swaps").await
    }

    async fn swaps_since(&self, cursor: Cursor) -> Result<Vec<Swap>, SourceError> {
        let rows: Vec<SwapRow> = self.page(SWAPS_QUERY, "swaps", cursor).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn latest_burn_id(&self) -> Result<Cursor, SourceError> {
        self.latest("burns").await
    }

    async fn burns_since(&self, cursor: Cursor) -> Result<Vec<Burn>, SourceError> {
        let rows: Vec<BurnRow> = self.page(BURNS_QUERY, "burns", cursor).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn latest_deposit_id(&self) -> Result<Cursor, SourceError> {
        self.latest("deposits").await
    }

    async fn deposits_since(&self, cursor: Cursor) -> Result<Vec<LiquidityDeposit>, SourceError> {
        let rows: Vec<DepositRow> = self.page(DEPOSITS_QUERY, "deposits", cursor).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn latest_delegation_id(&self) -> Result<Cursor, SourceError> {
        self.latest("delegations").await
    }

    async fn delegations_since(&self, cursor: Cursor) -> Result<Vec<Delegation>, SourceError> {
        let rows: Vec<DelegationRow> = self.page(DELEGATIONS_QUERY, "delegations", cursor).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delegation_status(&self, tx_hash: &str) -> Result<DelegationStatus, SourceError> {
        #[derive(Deserialize)]
        struct Transaction {
            status: String,
        }

        #[derive(Deserialize)]
        struct Data {
            transaction: Option<Transaction>,
        }

        let data: Data = self
            .query(TRANSACTION_QUERY, json!({ "hash": tx_hash }))
            .await?;

        // Not indexed yet counts as pending.
        Ok(match data.transaction.as_ref().map(|t| t.status.as_str()) {
            Some("finalized" | "success") => DelegationStatus::Finalized,
            Some("failed" | "reverted") => DelegationStatus::Failed,
            _ => DelegationStatus::Pending,
        })
    }

    async fn volume_summary(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<VolumeSummary, SourceError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct DayData {
            #[serde(rename = "volumeUSD", deserialize_with = "decimal")]
            volume_usd: f64,
            #[serde(deserialize_with = "integer")]
            tx_count: u64,
            #[serde(deserialize_with = "integer")]
            unique_traders: u64,
            #[serde(rename = "burnedUSD", deserialize_with = "decimal")]
            burned_usd: f64,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            day_datas: Vec<DayData>,
        }

        let data: Data = self
            .query(
                DAY_DATA_QUERY,
                json!({ "start": start.timestamp(), "end": end.timestamp() }),
            )
            .await?;

        Ok(data.day_datas.iter().fold(
            VolumeSummary {
                period_start: start,
                period_end: end,
                volume_usd: 0.0,
                swap_count: 0,
                unique_traders: 0,
                burned_usd: 0.0,
            },
            |mut acc, day| {
                acc.volume_usd += day.volume_usd;
                acc.swap_count += day.tx_count;
                acc.unique_traders += day.unique_traders;
                acc.burned_usd += day.burned_usd;
                acc
            },
        ))
    }
}

// === Wire rows ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapRow {
    index: Cursor,
    #[serde(deserialize_with = "unix_seconds")]
    timestamp: DateTime<Utc>,
    transaction: String,
    sender: String,
    token_in: String,
    token_out: String,
    #[serde(deserialize_with = "decimal")]
    amount_in: f64,
    #[serde(deserialize_with = "decimal")]
    amount_out: f64,
    #[serde(rename = "amountUSD", deserialize_with = "decimal")]
    amount_usd: f64,
}

impl From<SwapRow> for Swap {
    fn from(r: SwapRow) -> Self {
        Self {
            id: r.index,
            timestamp: r.timestamp,
            tx_hash: r.transaction,
            trader: r.sender,
            token_in: r.token_in,
            token_out: r.token_out,
            amount_in: r.amount_in,
            amount_out: r.amount_out,
            usd_value: r.amount_usd,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BurnRow {
    index: Cursor,
    #[serde(deserialize_with = "unix_seconds")]
    timestamp: DateTime<Utc>,
    transaction: String,
    sender: String,
    token: String,
    #[serde(deserialize_with = "decimal")]
    amount: f64,
    #[serde(rename = "amountUSD", deserialize_with = "decimal")]
    amount_usd: f64,
}

impl From<BurnRow> for Burn {
    fn from(r: BurnRow) -> Self {
        Self {
            id: r.index,
            timestamp: r.timestamp,
            tx_hash: r.transaction,
            burner: r.sender,
            token: r.token,
            amount: r.amount,
            usd_value: r.amount_usd,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DepositRow {
    index: Cursor,
    #[serde(deserialize_with = "unix_seconds")]
    timestamp: DateTime<Utc>,
    transaction: String,
    provider: String,
    pool: String,
    token0: String,
    token1: String,
    #[serde(deserialize_with = "decimal")]
    amount0: f64,
    #[serde(deserialize_with = "decimal")]
    amount1: f64,
    #[serde(rename = "amountUSD", deserialize_with = "decimal")]
    amount_usd: f64,
}

impl From<DepositRow> for LiquidityDeposit {
    fn from(r: DepositRow) -> Self {
        Self {
            id: r.index,
            timestamp: r.timestamp,
            tx_hash: r.transaction,
            provider: r.provider,
            pool: r.pool,
            token_a: r.token0,
            token_b: r.token1,
            amount_a: r.amount0,
            amount_b: r.amount1,
            usd_value: r.amount_usd,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DelegationRow {
    index: Cursor,
    #[serde(deserialize_with = "unix_seconds")]
    timestamp: DateTime<Utc>,
    transaction: String,
    delegator: String,
    validator: String,
    #[serde(deserialize_with = "decimal")]
    amount: f64,
    kind: DelegationKind,
}

impl From<DelegationRow> for Delegation {
    fn from(r: DelegationRow) -> Self {
        Self {
            id: r.index,
            timestamp: r.timestamp,
            tx_hash: r.transaction,
            delegator: r.delegator,
            validator: r.validator,
            amount: r.amount,
            kind: r.kind,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    Text(String),
}

impl NumberOrString {
    fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }
}

fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let raw = NumberOrString::deserialize(deserializer)?;
    raw.as_text()
        .parse()
        .map_err(|_| serde::de::Error::custom(format!("invalid decimal: {}", raw.as_text())))
}

fn integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = NumberOrString::deserialize(deserializer)?;
    raw.as_text()
        .parse()
        .map_err(|_| serde::de::Error::custom(format!("invalid integer: {}", raw.as_text())))
}

fn unix_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let secs = integer(deserializer)?;
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}")))
}
