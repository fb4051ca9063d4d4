//! One pool of the chain: token metadata plus the managed positions in it.

use anchor_client::solana_sdk::pubkey::Pubkey;

use super::bucket::BucketRange;
use super::position::Position;

/// Token metadata carried for display and formatting only; the compliance
/// algorithm never looks at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMeta {
    pub symbol: String,
    pub decimals: u8,
}

impl TokenMeta {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Convert a base-unit quantity to UI units.
    pub fn ui_amount(&self, base_units: u128) -> f64 {
        base_units as f64 / 10f64.powi(i32::from(self.decimals))
    }
}

/// A liquidity venue covering one sub-range of the chain's bucket ids.
///
/// The pool has no bucket data of its own; its range is the union of its
/// positions' ranges.
#[derive(Debug, Clone)]
pub struct Pool {
    address: Pubkey,
    token_x: TokenMeta,
    token_y: TokenMeta,
    positions: Vec<Position>,
}

impl Pool {
    pub fn new(
        address: Pubkey,
        token_x: TokenMeta,
        token_y: TokenMeta,
        positions: Vec<Position>,
    ) -> Self {
        Self {
            address,
            token_x,
            token_y,
            positions,
        }
    }

    pub fn address(&self) -> Pubkey {
        self.address
    }

    pub fn token_x(&self) -> &TokenMeta {
        &self.token_x
    }

    pub fn token_y(&self) -> &TokenMeta {
        &self.token_y
    }

    /// "X/Y" pair label for logs and display rows.
    pub fn pair_label(&self) -> String {
        format!("{}/{}", self.token_x.symbol, self.token_y.symbol)
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position(&self, address: &Pubkey) -> Option<&Position> {
        self.positions.iter().find(|p| p.address() == *address)
    }

    pub fn position_mut(&mut self, address: &Pubkey) -> Option<&mut Position> {
        self.positions.iter_mut().find(|p| p.address() == *address)
    }

    /// Union of the positions' bucket ranges; `None` when no position has
    /// bucket data.
    pub fn bucket_range(&self) -> Option<BucketRange> {
        self.positions
            .iter()
            .filter_map(Position::bucket_range)
            .reduce(|acc, range| acc.union(&range))
    }

    pub fn contains_bucket(&self, bucket_id: i32) -> bool {
        self.bucket_range()
            .is_some_and(|range| range.contains(bucket_id))
    }
}
