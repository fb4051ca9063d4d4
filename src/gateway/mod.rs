//! Gateways to the AMM API and the ledger.
//!
//! This module provides:
//! - The per-pool HTTP service for prices, positions and liquidity intents
//! - Keypair signing and slot queries over JSON RPC
//! - Startup discovery of the configured pool chain

pub mod discovery;
pub mod http;
pub mod rpc;

pub use discovery::discover_chain;
pub use http::HttpPoolService;
pub use rpc::{KeypairSigner, RpcLedgerConnection};
