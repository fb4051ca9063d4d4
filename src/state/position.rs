//! A managed wallet's liquidity position inside one pool.

use anchor_client::solana_sdk::pubkey::Pubkey;

use super::bucket::{Bucket, BucketRange};

/// One position: an owned, ordered set of buckets inside a single pool.
///
/// The bucket list is the unit of refresh: after any on-ledger operation the
/// whole list is swapped for the freshly fetched one, never patched in place,
/// so the model is always a best-effort cache of ledger truth. Everything
/// else (range, totals) is derived on demand.
#[derive(Debug, Clone)]
pub struct Position {
    address: Pubkey,
    owner: Pubkey,
    buckets: Vec<Bucket>,
}

impl Position {
    /// Build a position; buckets are kept sorted by ascending id.
    pub fn new(address: Pubkey, owner: Pubkey, mut buckets: Vec<Bucket>) -> Self {
        buckets.sort_by_key(|b| b.id);
        Self {
            address,
            owner,
            buckets,
        }
    }

    pub fn address(&self) -> Pubkey {
        self.address
    }

    pub fn owner(&self) -> Pubkey {
        self.owner
    }

    /// Buckets in ascending id order. Duplicate ids may appear; consumers
    /// that need one data point per id aggregate them.
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Swap the entire bucket list for a freshly fetched one.
    pub fn replace_buckets(&mut self, mut buckets: Vec<Bucket>) {
        buckets.sort_by_key(|b| b.id);
        self.buckets = buckets;
    }

    /// Lowest bucket id, empty buckets included (they keep range membership).
    pub fn min_bucket_id(&self) -> Option<i32> {
        self.buckets.first().map(|b| b.id)
    }

    /// Highest bucket id, empty buckets included.
    pub fn max_bucket_id(&self) -> Option<i32> {
        self.buckets.last().map(|b| b.id)
    }

    /// Inclusive bucket range, `None` for a position with no bucket data.
    pub fn bucket_range(&self) -> Option<BucketRange> {
        Some(BucketRange::new(
            self.min_bucket_id()?,
            self.max_bucket_id()?,
        ))
    }

    pub fn contains_bucket(&self, bucket_id: i32) -> bool {
        self.bucket_range()
            .is_some_and(|range| range.contains(bucket_id))
    }

    /// Total X-token quantity across all buckets.
    pub fn total_x(&self) -> u128 {
        self.buckets.iter().map(|b| u128::from(b.amount_x)).sum()
    }

    /// Total Y-token quantity across all buckets.
    pub fn total_y(&self) -> u128 {
        self.buckets.iter().map(|b| u128::from(b.amount_y)).sum()
    }

    /// True when no bucket holds any liquidity.
    pub fn is_drained(&self) -> bool {
        self.buckets.iter().all(Bucket::is_empty)
    }
}
