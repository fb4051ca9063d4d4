//! Collaborator contracts the core calls through.
//!
//! The ledger connection, wallet signing, per-pool AMM gateway and the
//! display sink are all external services; the monitor and coordinator only
//! see these traits so tests can script them and the gateway layer stays
//! swappable.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anchor_client::solana_sdk::{pubkey::Pubkey, signature::Signature};
use anyhow::Result;
use async_trait::async_trait;

use crate::compliance::Side;
use crate::display::PoolRow;
use crate::state::BucketRange;

/// The active bucket and its price as reported by a pool gateway.
#[derive(Debug, Clone, Copy)]
pub struct ActiveBucket {
    pub id: i32,
    pub price: f64,
}

/// A position as fetched from a pool gateway, buckets still in their raw
/// upstream shape. Parsing happens in the state layer, which tolerates the
/// field-naming differences between SDK versions.
#[derive(Debug, Clone)]
pub struct RawPosition {
    pub address: Pubkey,
    pub buckets: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    RemoveLiquidity,
    AddLiquidity,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentKind::RemoveLiquidity => write!(f, "remove-liquidity"),
            IntentKind::AddLiquidity => write!(f, "add-liquidity"),
        }
    }
}

/// An unsigned ledger operation prepared by a pool gateway.
///
/// Each transaction is a base64-encoded serialized transaction; the wallet
/// signer re-signs it against a fresh blockhash before submission.
#[derive(Debug, Clone)]
pub struct LiquidityIntent {
    pub kind: IntentKind,
    pub transactions: Vec<String>,
}

/// Per-pool AMM gateway.
#[async_trait]
pub trait PoolService: Send + Sync {
    /// The currently active bucket and its price.
    async fn active_bucket(&self) -> Result<ActiveBucket>;

    /// All positions in this pool owned by `owner`, buckets unparsed.
    async fn positions_for_owner(&self, owner: &Pubkey) -> Result<Vec<RawPosition>>;

    /// Prepare withdrawal of all liquidity in `range`, leaving the
    /// position open.
    async fn remove_liquidity(&self, position: &Pubkey, range: BucketRange)
    -> Result<LiquidityIntent>;

    /// Prepare a BidAsk-shaped deposit over `range`, single-sided toward X
    /// for [`Side::Above`] and toward Y for [`Side::Below`].
    async fn add_liquidity_with_strategy(
        &self,
        position: &Pubkey,
        range: BucketRange,
        total_x: u64,
        total_y: u64,
        side: Side,
    ) -> Result<LiquidityIntent>;
}

/// Wallet identity and transaction submission.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn public_identity(&self) -> Pubkey;

    /// Sign every transaction in `intent` and submit them in order,
    /// returning the confirmed signatures.
    async fn sign_and_submit(&self, intent: LiquidityIntent) -> Result<Vec<Signature>>;
}

/// Minimal ledger endpoint surface, used to validate liveness at startup.
#[async_trait]
pub trait LedgerConnection: Send + Sync {
    async fn current_slot(&self) -> Result<u64>;
}

/// Presentation sink fed after structural changes. The core never reads
/// this data back.
#[async_trait]
pub trait DiscoverySink: Send + Sync {
    async fn update_pools_data(&self, rows: Vec<PoolRow>);
}

/// Pool gateways keyed by pool address, iterable in registration order.
#[derive(Default)]
pub struct PoolServices {
    services: HashMap<Pubkey, Arc<dyn PoolService>>,
    order: Vec<Pubkey>,
}

impl PoolServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pool: Pubkey, service: Arc<dyn PoolService>) {
        if self.services.insert(pool, service).is_none() {
            self.order.push(pool);
        }
    }

    pub fn get(&self, pool: &Pubkey) -> Option<Arc<dyn PoolService>> {
        self.services.get(pool).cloned()
    }

    /// The earliest-registered gateway, the fallback price source when the
    /// active bucket sits in no tracked pool.
    pub fn first(&self) -> Option<(Pubkey, Arc<dyn PoolService>)> {
        let pool = *self.order.first()?;
        Some((pool, self.services.get(&pool)?.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pubkey, Arc<dyn PoolService>)> + '_ {
        self.order
            .iter()
            .filter_map(|pool| Some((*pool, self.services.get(pool)?.clone())))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullService;

    #[async_trait]
    impl PoolService for NullService {
        async fn active_bucket(&self) -> Result<ActiveBucket> {
            Ok(ActiveBucket { id: 0, price: 0.0 })
        }

        async fn positions_for_owner(&self, _owner: &Pubkey) -> Result<Vec<RawPosition>> {
            Ok(Vec::new())
        }

        async fn remove_liquidity(
            &self,
            _position: &Pubkey,
            _range: BucketRange,
        ) -> Result<LiquidityIntent> {
            Ok(LiquidityIntent {
                kind: IntentKind::RemoveLiquidity,
                transactions: Vec::new(),
            })
        }

        async fn add_liquidity_with_strategy(
            &self,
            _position: &Pubkey,
            _range: BucketRange,
            _total_x: u64,
            _total_y: u64,
            _side: Side,
        ) -> Result<LiquidityIntent> {
            Ok(LiquidityIntent {
                kind: IntentKind::AddLiquidity,
                transactions: Vec::new(),
            })
        }
    }

    #[test]
    fn test_first_follows_registration_order() {
        let mut services = PoolServices::new();
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        services.insert(a, Arc::new(NullService));
        services.insert(b, Arc::new(NullService));

        assert_eq!(services.len(), 2);
        assert_eq!(services.first().map(|(pool, _)| pool), Some(a));

        let order: Vec<Pubkey> = services.iter().map(|(pool, _)| pool).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn test_reinsert_keeps_original_order_slot() {
        let mut services = PoolServices::new();
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        services.insert(a, Arc::new(NullService));
        services.insert(b, Arc::new(NullService));
        services.insert(a, Arc::new(NullService));

        assert_eq!(services.len(), 2);
        assert_eq!(services.first().map(|(pool, _)| pool), Some(a));
    }

    #[test]
    fn test_intent_kind_labels() {
        assert_eq!(IntentKind::RemoveLiquidity.to_string(), "remove-liquidity");
        assert_eq!(IntentKind::AddLiquidity.to_string(), "add-liquidity");
    }
}
