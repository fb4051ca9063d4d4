//! Lookups over the pool chain: which pool or position holds a bucket, and
//! how the positions around the active bucket score on compliance.
//!
//! Everything in here is a pure read over in-memory state. Positions with
//! no bucket data have no range and never qualify as a match.

use anchor_client::solana_sdk::pubkey::Pubkey;

use crate::compliance::{Side, distribution_compliant, side_of};
use crate::state::{BucketRange, Pool, PoolChain, Position};

/// The pool whose bucket range spans `bucket_id`, if any.
///
/// Absence means the price moved outside every tracked range and the bot
/// is in monitoring-only mode.
pub fn pool_containing(chain: &PoolChain, bucket_id: i32) -> Option<&Pool> {
    chain.pools().iter().find(|p| p.contains_bucket(bucket_id))
}

/// The position in `pool` whose range spans `bucket_id`, if any.
pub fn position_containing(pool: &Pool, bucket_id: i32) -> Option<&Position> {
    pool.positions()
        .iter()
        .find(|p| p.contains_bucket(bucket_id))
}

/// Among positions lying entirely below `bucket_id`, the one closest to it
/// (greatest maximum bucket id). Ties keep the first position found.
pub fn lower_neighbor_position(pool: &Pool, bucket_id: i32) -> Option<&Position> {
    let mut best: Option<(&Position, i32)> = None;
    for position in pool.positions() {
        let Some(max) = position.max_bucket_id() else {
            continue;
        };
        if max >= bucket_id {
            continue;
        }
        if best.is_none_or(|(_, best_max)| max > best_max) {
            best = Some((position, max));
        }
    }
    best.map(|(position, _)| position)
}

/// Among positions lying entirely above `bucket_id`, the one closest to it
/// (least minimum bucket id). Ties keep the first position found.
pub fn higher_neighbor_position(pool: &Pool, bucket_id: i32) -> Option<&Position> {
    let mut best: Option<(&Position, i32)> = None;
    for position in pool.positions() {
        let Some(min) = position.min_bucket_id() else {
            continue;
        };
        if min <= bucket_id {
            continue;
        }
        if best.is_none_or(|(_, best_min)| min < best_min) {
            best = Some((position, min));
        }
    }
    best.map(|(position, _)| position)
}

/// Compliance verdict for a single position around the active bucket.
#[derive(Debug, Clone, Copy)]
pub struct PositionCompliance {
    pub pool: Pubkey,
    pub position: Pubkey,
    pub range: BucketRange,
    pub side: Side,
    pub compliant: bool,
}

/// Compliance report for the positions neighboring the active bucket.
///
/// A missing neighbor is reported as `None`, not an error.
#[derive(Debug, Clone, Copy)]
pub struct NeighborCompliance {
    pub pool: Pubkey,
    pub active_bucket_id: i32,
    pub lower: Option<PositionCompliance>,
    pub current: Option<PositionCompliance>,
    pub higher: Option<PositionCompliance>,
}

/// Resolve the current pool and score its lower, current and higher
/// positions against the side-aware BidAsk rule.
///
/// Returns `None` when no observation has been recorded yet or the active
/// bucket lies outside every tracked pool.
pub fn check_neighboring_compliance(chain: &PoolChain) -> Option<NeighborCompliance> {
    let active_bucket_id = chain.current_bucket_id()?;
    let pool = pool_containing(chain, active_bucket_id)?;

    let verdict = |position: &Position| -> Option<PositionCompliance> {
        let range = position.bucket_range()?;
        let side = side_of(range, active_bucket_id);
        Some(PositionCompliance {
            pool: pool.address(),
            position: position.address(),
            range,
            side,
            compliant: distribution_compliant(position.buckets(), side),
        })
    };

    Some(NeighborCompliance {
        pool: pool.address(),
        active_bucket_id,
        lower: lower_neighbor_position(pool, active_bucket_id).and_then(verdict),
        current: position_containing(pool, active_bucket_id).and_then(verdict),
        higher: higher_neighbor_position(pool, active_bucket_id).and_then(verdict),
    })
}
