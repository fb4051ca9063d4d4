//! Row descriptors handed to the display sink.
//!
//! Token decimals matter only here; compliance and adjustment work on base
//! units throughout.

use anchor_client::solana_sdk::pubkey::Pubkey;
use chrono::{DateTime, Utc};

use crate::state::{BucketRange, PoolChain};

/// One pool's display state. The row for the current pool also carries the
/// chain-level observation scalars.
#[derive(Debug, Clone)]
pub struct PoolRow {
    pub address: Pubkey,
    pub pair: String,
    pub range: Option<BucketRange>,
    pub positions: usize,
    pub total_x: f64,
    pub total_y: f64,
    pub is_current: bool,
    pub active_bucket_id: Option<i32>,
    pub price: Option<f64>,
    pub observed_at: Option<DateTime<Utc>>,
}

/// Snapshot the chain into display rows, in chain order.
pub fn pool_rows(chain: &PoolChain) -> Vec<PoolRow> {
    let active_bucket_id = chain.current_bucket_id();

    chain
        .pools()
        .iter()
        .map(|pool| {
            let total_x: u128 = pool.positions().iter().map(|p| p.total_x()).sum();
            let total_y: u128 = pool.positions().iter().map(|p| p.total_y()).sum();
            let is_current = active_bucket_id.is_some_and(|id| pool.contains_bucket(id));

            PoolRow {
                address: pool.address(),
                pair: pool.pair_label(),
                range: pool.bucket_range(),
                positions: pool.positions().len(),
                total_x: pool.token_x().ui_amount(total_x),
                total_y: pool.token_y().ui_amount(total_y),
                is_current,
                active_bucket_id: active_bucket_id.filter(|_| is_current),
                price: chain.current_price().filter(|_| is_current),
                observed_at: chain.observed_at().filter(|_| is_current),
            }
        })
        .collect()
}
