mod config;
mod terminal;

use std::{sync::Arc, time::Duration};

use anchor_client::solana_sdk::{
    commitment_config::CommitmentConfig, signature::read_keypair_file, signer::Signer,
};
use anyhow::Context;
use config::Config;
use dlmm_chain_rebalancing::{
    DiscoverySink, KeypairSigner, LedgerConnection, PriceMonitor, RebalanceCoordinator,
    RpcLedgerConnection, discover_chain, pool_rows, telemetry,
};
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use terminal::TerminalSink;
use tokio::{signal, sync::RwLock, time::sleep};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env()?;
    let _telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    let wallet = read_keypair_file(&config.keypair_path).map_err(|e| {
        anyhow::anyhow!("Failed to read keypair from {}: {}", config.keypair_path, e)
    })?;
    let wallet = Arc::new(wallet);
    let owner = wallet.pubkey();

    let rpc = Arc::new(RpcClient::new_with_commitment(
        config.rpc_url.clone(),
        CommitmentConfig::confirmed(),
    ));

    let ledger = RpcLedgerConnection::new(rpc.clone());
    let slot = ledger
        .current_slot()
        .await
        .context("Ledger connection check failed")?;

    println!("Starting rebalance-flow binary");
    println!("Wallet: {owner}");
    println!("Current slot: {slot}");
    println!("Pools: {}", config.pool_addresses.len());
    println!("Poll interval: {}s", config.poll_interval_secs);
    println!("Adjust interval: {}s", config.adjust_interval_secs);

    let http_client = reqwest::Client::new();
    let (chain, services) = discover_chain(
        &http_client,
        &config.amm_api_url,
        &config.pool_addresses,
        &owner,
    )
    .await?;

    let chain = Arc::new(RwLock::new(chain));
    let services = Arc::new(services);
    let signer = Arc::new(KeypairSigner::new(rpc.clone(), wallet.clone()));
    let sink = Arc::new(TerminalSink);

    sink.update_pools_data(pool_rows(&*chain.read().await)).await;

    let coordinator = Arc::new(RebalanceCoordinator::new(
        chain.clone(),
        services.clone(),
        signer,
        sink,
    ));

    let monitor = Arc::new(PriceMonitor::new(
        chain.clone(),
        services.clone(),
        Duration::from_secs(config.poll_interval_secs),
    ));

    monitor.on_price_changed("log-price", |event| {
        info!(
            previous = event.previous_bucket_id,
            bucket = event.bucket_id,
            price = event.price,
            "Active bucket moved"
        );
        Ok(())
    });

    let crossing_coordinator = coordinator.clone();
    monitor.on_pool_crossed("rebalance-on-crossing", move |event| {
        info!(
            from = ?event.from_pool,
            to = ?event.to_pool,
            bucket = event.bucket_id,
            "Pool boundary crossed"
        );
        let coordinator = crossing_coordinator.clone();
        tokio::spawn(async move {
            if let Err(e) = coordinator.check_and_adjust_neighboring_pools().await {
                warn!(error = %e, "Rebalance after crossing failed");
            }
        });
        Ok(())
    });

    monitor.start_monitoring();

    let adjust_interval = Duration::from_secs(config.adjust_interval_secs);

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                println!("Shutting down...");
                break;
            }
            _ = sleep(adjust_interval) => {
                if let Err(e) = coordinator.check_and_adjust_neighboring_pools().await {
                    warn!(error = %e, "Scheduled rebalance check failed");
                }
            }
        }
    }

    monitor.stop_monitoring();

    Ok(())
}
