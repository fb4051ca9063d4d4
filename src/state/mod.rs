//! In-memory model of the pool chain.
//!
//! This module provides:
//! - Bucket-level amounts parsed from gateway payloads
//! - Positions, pools and the chain aggregate the bot operates on

pub mod bucket;
pub mod chain;
pub mod pool;
pub mod position;

pub use bucket::{Bucket, BucketRange, parse_buckets};
pub use chain::PoolChain;
pub use pool::{Pool, TokenMeta};
pub use position::Position;
