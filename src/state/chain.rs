//! The pool chain: every tracked pool plus the last market observation.

use anchor_client::solana_sdk::pubkey::Pubkey;
use chrono::{DateTime, Utc};

use super::pool::Pool;

/// Ordered collection of pools covering adjacent price ranges, together with
/// the last-observed active bucket and price.
///
/// Pools are sorted by ascending minimum bucket id at construction; ranges
/// are non-overlapping by construction of the deployment, not enforced here.
/// The observation scalars are overwritten by the price monitor and read by
/// everything else; they start unset until the first observation lands.
#[derive(Debug, Clone)]
pub struct PoolChain {
    pools: Vec<Pool>,
    current_bucket_id: Option<i32>,
    current_price: Option<f64>,
    observed_at: Option<DateTime<Utc>>,
}

impl PoolChain {
    pub fn new(mut pools: Vec<Pool>) -> Self {
        // Pools without bucket data sort to the end; their order is moot
        // until a refresh gives them a range.
        pools.sort_by_key(|p| p.bucket_range().map_or(i32::MAX, |r| r.min));
        Self {
            pools,
            current_bucket_id: None,
            current_price: None,
            observed_at: None,
        }
    }

    /// Pools in ascending range order.
    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn pool(&self, address: &Pubkey) -> Option<&Pool> {
        self.pools.iter().find(|p| p.address() == *address)
    }

    pub fn pool_mut(&mut self, address: &Pubkey) -> Option<&mut Pool> {
        self.pools.iter_mut().find(|p| p.address() == *address)
    }

    pub fn current_bucket_id(&self) -> Option<i32> {
        self.current_bucket_id
    }

    pub fn current_price(&self) -> Option<f64> {
        self.current_price
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.observed_at
    }

    /// Record a fresh market observation, returning the previously stored
    /// bucket id.
    pub fn record_observation(&mut self, bucket_id: i32, price: f64) -> Option<i32> {
        let previous = self.current_bucket_id;
        self.current_bucket_id = Some(bucket_id);
        self.current_price = Some(price);
        self.observed_at = Some(Utc::now());
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Bucket, Pool, Position, TokenMeta};

    fn pool_spanning(min: i32, max: i32) -> Pool {
        let owner = Pubkey::new_unique();
        Pool::new(
            Pubkey::new_unique(),
            TokenMeta::new("X", 9),
            TokenMeta::new("Y", 6),
            vec![Position::new(
                Pubkey::new_unique(),
                owner,
                vec![Bucket::new(min, 1, 1), Bucket::new(max, 1, 1)],
            )],
        )
    }

    #[test]
    fn test_pools_sorted_by_ascending_min_bucket_id() {
        let chain = PoolChain::new(vec![
            pool_spanning(50, 80),
            pool_spanning(-10, 5),
            pool_spanning(10, 40),
        ]);

        let mins: Vec<i32> = chain
            .pools()
            .iter()
            .map(|p| p.bucket_range().unwrap().min)
            .collect();
        assert_eq!(mins, vec![-10, 10, 50]);
    }

    #[test]
    fn test_observation_scalars_start_unset() {
        let chain = PoolChain::new(vec![pool_spanning(0, 10)]);
        assert_eq!(chain.current_bucket_id(), None);
        assert_eq!(chain.current_price(), None);
        assert!(chain.observed_at().is_none());
    }

    #[test]
    fn test_record_observation_returns_previous_bucket() {
        let mut chain = PoolChain::new(vec![pool_spanning(0, 10)]);

        assert_eq!(chain.record_observation(4, 1.01), None);
        assert_eq!(chain.record_observation(5, 1.02), Some(4));
        assert_eq!(chain.current_bucket_id(), Some(5));
        assert_eq!(chain.current_price(), Some(1.02));
        assert!(chain.observed_at().is_some());
    }
}
