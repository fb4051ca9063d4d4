//! HTTP gateway to the AMM's pool API.
//!
//! One instance per pool. The API prepares liquidity transactions server
//! side and returns them base64-encoded; signing and submission live in the
//! rpc gateway. Position and active-bin payloads vary across API versions,
//! so responses are probed rather than strictly deserialized.

use std::str::FromStr;

use anchor_client::solana_sdk::pubkey::Pubkey;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::compliance::Side;
use crate::retry::{RetryPolicy, with_retry};
use crate::service::{ActiveBucket, IntentKind, LiquidityIntent, PoolService, RawPosition};
use crate::state::bucket::{PRICE_KEYS, probe_f64, probe_i32};
use crate::state::{BucketRange, TokenMeta};

/// Probe order for the active bucket id across API versions.
const ACTIVE_BUCKET_ID_KEYS: &[&str] = &["binId", "activeBin", "activeId", "active_bin_id"];

/// Probe order for a position's own address field.
const POSITION_ADDRESS_KEYS: &[&str] = &["address", "publicKey", "positionAddress"];

/// Probe order for a position's bucket list field.
const POSITION_BUCKET_KEYS: &[&str] = &["positionBinData", "binData", "buckets"];

#[derive(Deserialize)]
struct TokenMetaResponse {
    symbol: String,
    decimals: u8,
}

#[derive(Deserialize)]
struct PoolMetaResponse {
    #[serde(alias = "tokenX")]
    token_x: TokenMetaResponse,
    #[serde(alias = "tokenY")]
    token_y: TokenMetaResponse,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoveLiquidityRequest {
    position: String,
    min_bin_id: i32,
    max_bin_id: i32,
    /// Share of liquidity to withdraw, in basis points.
    bps: u16,
    should_close: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddLiquidityRequest {
    position: String,
    min_bin_id: i32,
    max_bin_id: i32,
    /// Amounts ride as strings so large values survive JSON round trips.
    total_x_amount: String,
    total_y_amount: String,
    strategy: &'static str,
    single_sided_x: bool,
}

#[derive(Deserialize)]
struct IntentResponse {
    #[serde(default)]
    transactions: Vec<String>,
    #[serde(default)]
    transaction: Option<String>,
}

impl IntentResponse {
    fn into_transactions(self) -> Vec<String> {
        if self.transactions.is_empty() {
            self.transaction.into_iter().collect()
        } else {
            self.transactions
        }
    }
}

/// Extract a position from its raw payload, tolerating the known field
/// spellings. `None` means the shape was not recognized at all.
fn parse_raw_position(raw: &Value) -> Option<RawPosition> {
    let address = probe_pubkey(raw, POSITION_ADDRESS_KEYS)?;
    let buckets = POSITION_BUCKET_KEYS
        .iter()
        .find_map(|key| raw.get(key).and_then(Value::as_array))
        .cloned()
        .unwrap_or_default();
    Some(RawPosition { address, buckets })
}

fn probe_pubkey(raw: &Value, keys: &[&str]) -> Option<Pubkey> {
    for key in keys {
        if let Some(field) = raw.get(key).and_then(Value::as_str) {
            if let Ok(parsed) = Pubkey::from_str(field) {
                return Some(parsed);
            }
        }
    }
    None
}

/// [`PoolService`] implementation over the AMM's HTTP API.
pub struct HttpPoolService {
    client: reqwest::Client,
    base_url: String,
    pool: Pubkey,
    retry: RetryPolicy,
}

impl HttpPoolService {
    pub fn new(client: reqwest::Client, base_url: &str, pool: Pubkey) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            pool,
            retry: RetryPolicy::default(),
        }
    }

    pub fn pool(&self) -> Pubkey {
        self.pool
    }

    /// Token metadata for both sides of the pool, used at discovery time.
    pub async fn pool_meta(&self) -> Result<(TokenMeta, TokenMeta)> {
        let url = format!("{}/pools/{}", self.base_url, self.pool);
        let meta = with_retry(self.retry, "pool-meta", || async {
            let response = self.client.get(&url).send().await?.error_for_status()?;
            Ok(response.json::<PoolMetaResponse>().await?)
        })
        .await?;

        Ok((
            TokenMeta::new(meta.token_x.symbol, meta.token_x.decimals),
            TokenMeta::new(meta.token_y.symbol, meta.token_y.decimals),
        ))
    }

    async fn post_intent(
        &self,
        op: &str,
        body: &impl Serialize,
        kind: IntentKind,
    ) -> Result<LiquidityIntent> {
        let url = format!("{}/pools/{}/{}", self.base_url, self.pool, op);
        let response = with_retry(self.retry, op, || async {
            let response = self
                .client
                .post(&url)
                .json(body)
                .send()
                .await?
                .error_for_status()?;
            Ok(response.json::<IntentResponse>().await?)
        })
        .await?;

        let transactions = response.into_transactions();
        if transactions.is_empty() {
            anyhow::bail!("{op} returned no transactions");
        }
        Ok(LiquidityIntent { kind, transactions })
    }
}

#[async_trait]
impl PoolService for HttpPoolService {
    async fn active_bucket(&self) -> Result<ActiveBucket> {
        let url = format!("{}/pools/{}/active-bin", self.base_url, self.pool);
        let raw = with_retry(self.retry, "active-bin", || async {
            let response = self.client.get(&url).send().await?.error_for_status()?;
            Ok(response.json::<Value>().await?)
        })
        .await?;

        let id =
            probe_i32(&raw, ACTIVE_BUCKET_ID_KEYS).context("active bin payload carries no id")?;
        let price = probe_f64(&raw, PRICE_KEYS).context("active bin payload carries no price")?;
        Ok(ActiveBucket { id, price })
    }

    async fn positions_for_owner(&self, owner: &Pubkey) -> Result<Vec<RawPosition>> {
        let url = format!("{}/pools/{}/positions", self.base_url, self.pool);
        let owner = owner.to_string();
        let raw = with_retry(self.retry, "positions", || async {
            let response = self
                .client
                .get(&url)
                .query(&[("owner", owner.as_str())])
                .send()
                .await?
                .error_for_status()?;
            Ok(response.json::<Vec<Value>>().await?)
        })
        .await?;

        let mut positions = Vec::with_capacity(raw.len());
        for value in &raw {
            match parse_raw_position(value) {
                Some(position) => positions.push(position),
                None => {
                    warn!(pool = %self.pool, "Skipping position payload with unrecognized shape");
                }
            }
        }
        Ok(positions)
    }

    async fn remove_liquidity(
        &self,
        position: &Pubkey,
        range: BucketRange,
    ) -> Result<LiquidityIntent> {
        let body = RemoveLiquidityRequest {
            position: position.to_string(),
            min_bin_id: range.min,
            max_bin_id: range.max,
            bps: 10_000,
            should_close: false,
        };
        self.post_intent("remove-liquidity", &body, IntentKind::RemoveLiquidity)
            .await
    }

    async fn add_liquidity_with_strategy(
        &self,
        position: &Pubkey,
        range: BucketRange,
        total_x: u64,
        total_y: u64,
        side: Side,
    ) -> Result<LiquidityIntent> {
        let body = AddLiquidityRequest {
            position: position.to_string(),
            min_bin_id: range.min,
            max_bin_id: range.max,
            total_x_amount: total_x.to_string(),
            total_y_amount: total_y.to_string(),
            strategy: "BidAsk",
            single_sided_x: side.is_above(),
        };
        self.post_intent("add-liquidity", &body, IntentKind::AddLiquidity)
            .await
    }
}
