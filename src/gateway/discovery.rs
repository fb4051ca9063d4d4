//! Startup discovery of the configured pool chain.

use std::sync::Arc;

use anchor_client::solana_sdk::pubkey::Pubkey;
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::gateway::http::HttpPoolService;
use crate::service::{PoolService, PoolServices};
use crate::state::{Pool, PoolChain, Position, parse_buckets};

/// Fetch metadata and owned positions for every configured pool, returning
/// the assembled chain plus one gateway per pool.
///
/// Metadata or position failures abort discovery; a bot running with a
/// partial chain would misread pool boundaries. The initial observation is
/// seeded from the first gateway that answers, so the monitor starts with a
/// baseline; if none answers, the first refresh seeds it instead.
pub async fn discover_chain(
    client: &reqwest::Client,
    api_url: &str,
    pool_addresses: &[Pubkey],
    owner: &Pubkey,
) -> Result<(PoolChain, PoolServices)> {
    let mut pools = Vec::with_capacity(pool_addresses.len());
    let mut services = PoolServices::new();

    for address in pool_addresses {
        let service = Arc::new(HttpPoolService::new(client.clone(), api_url, *address));

        let (token_x, token_y) = service
            .pool_meta()
            .await
            .with_context(|| format!("metadata fetch failed for pool {address}"))?;
        let raw_positions = service
            .positions_for_owner(owner)
            .await
            .with_context(|| format!("position fetch failed for pool {address}"))?;

        let positions: Vec<Position> = raw_positions
            .into_iter()
            .map(|raw| Position::new(raw.address, *owner, parse_buckets(&raw.buckets)))
            .collect();

        info!(
            pool = %address,
            pair = %format!("{}/{}", token_x.symbol, token_y.symbol),
            positions = positions.len(),
            "Discovered pool"
        );
        pools.push(Pool::new(*address, token_x, token_y, positions));
        services.insert(*address, service);
    }

    let mut chain = PoolChain::new(pools);

    for (pool, service) in services.iter() {
        match service.active_bucket().await {
            Ok(active) => {
                chain.record_observation(active.id, active.price);
                info!(
                    pool = %pool,
                    bucket = active.id,
                    price = active.price,
                    "Seeded initial observation"
                );
                break;
            }
            Err(e) => {
                warn!(pool = %pool, error = %e, "Active bucket unavailable during discovery");
            }
        }
    }

    Ok((chain, services))
}
