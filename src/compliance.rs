//! Compliance checks for BidAsk-shaped liquidity distributions.
//!
//! A position keeps its BidAsk shape while its capital changes strictly
//! monotonically across bucket ids: X amounts rising for positions above
//! the active bucket, Y amounts falling for positions below it. A flat or
//! inverted run means the shape decayed (partial fills) and the position
//! needs rebalancing.

use std::collections::BTreeMap;
use std::fmt;

use crate::state::{Bucket, BucketRange};

/// Which side of the active bucket a position sits on.
///
/// The side decides which token's amounts are checked, the expected
/// direction of the walk, and which token the re-add strategy is skewed
/// toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Range above the active bucket. Checked on X amounts, ascending.
    Above,
    /// Range below the active bucket. Checked on Y amounts, descending.
    Below,
}

impl Side {
    pub fn is_above(&self) -> bool {
        matches!(self, Side::Above)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Above => write!(f, "above"),
            Side::Below => write!(f, "below"),
        }
    }
}

/// Classify a bucket range relative to the active bucket.
///
/// Ranges entirely above or below classify directly. A straddling range is
/// split at its floor midpoint: an active bucket at or past the midpoint
/// counts as the above case, otherwise the below case.
pub fn side_of(range: BucketRange, active_bucket_id: i32) -> Side {
    if active_bucket_id < range.min {
        return Side::Above;
    }
    if active_bucket_id > range.max {
        return Side::Below;
    }
    // Straddling. Sum in i64 so min + max cannot overflow; div_euclid
    // floors toward negative infinity for negative bucket ids.
    let midpoint = (range.min as i64 + range.max as i64).div_euclid(2);
    if active_bucket_id as i64 >= midpoint {
        Side::Above
    } else {
        Side::Below
    }
}

/// Check that `values` is strictly monotonic in the expected direction.
///
/// Zero entries carry no shape information and are filtered out first; a
/// sequence left with at most one value is trivially compliant. Ties are
/// violations: strict inequality is required at every adjacent pair.
pub fn is_compliant(values: &[u128], ascending_expected: bool) -> bool {
    let mut filtered = values.iter().copied().filter(|v| *v != 0);

    let Some(mut previous) = filtered.next() else {
        return true;
    };
    for current in filtered {
        let ok = if ascending_expected {
            current > previous
        } else {
            current < previous
        };
        if !ok {
            return false;
        }
        previous = current;
    }
    true
}

/// Evaluate a position's buckets against the BidAsk shape for `side`.
///
/// Buckets sharing an id are aggregated into a single data point and the
/// result is walked in ascending id order, independent of caller insertion
/// order.
pub fn distribution_compliant(buckets: &[Bucket], side: Side) -> bool {
    let mut by_id: BTreeMap<i32, u128> = BTreeMap::new();
    for bucket in buckets {
        let amount = match side {
            Side::Above => bucket.amount_x,
            Side::Below => bucket.amount_y,
        };
        *by_id.entry(bucket.id).or_insert(0) += amount as u128;
    }

    let values: Vec<u128> = by_id.into_values().collect();
    is_compliant(&values, side.is_above())
}
