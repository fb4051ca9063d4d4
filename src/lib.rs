pub mod compliance;
pub mod coordinator;
pub mod display;
pub mod events;
pub mod gateway;
pub mod monitor;
pub mod registry;
pub mod retry;
pub mod service;
pub mod state;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use compliance::{Side, distribution_compliant, is_compliant, side_of};
pub use coordinator::{CycleSummary, RebalanceCoordinator};
pub use display::{PoolRow, pool_rows};
pub use events::{PoolCrossed, PriceChanged};
pub use gateway::{HttpPoolService, KeypairSigner, RpcLedgerConnection, discover_chain};
pub use monitor::{MonitorState, PriceMonitor};
pub use registry::{NeighborCompliance, PositionCompliance, check_neighboring_compliance};
pub use service::{
    ActiveBucket, DiscoverySink, IntentKind, LedgerConnection, LiquidityIntent, PoolService,
    PoolServices, RawPosition, WalletSigner,
};
pub use state::{Bucket, BucketRange, Pool, PoolChain, Position, TokenMeta, parse_buckets};
