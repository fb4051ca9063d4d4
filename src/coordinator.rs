//! The remove-then-readd adjustment sequence and its concurrency guard.
//!
//! At most one rebalance runs at a time; overlapping triggers are dropped,
//! not queued, since the next tick re-evaluates current state anyway. All
//! ledger-affecting calls run sequentially against the one managed wallet.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::display::pool_rows;
use crate::registry::{PositionCompliance, check_neighboring_compliance};
use crate::service::{DiscoverySink, PoolService, PoolServices, WalletSigner};
use crate::state::{PoolChain, parse_buckets};

/// Clears the in-flight flag on every exit path.
struct AdjustingGuard<'a>(&'a AtomicBool);

impl Drop for AdjustingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Adjusted and failed counts for one rebalance cycle. A dropped trigger
/// or an out-of-range bucket reports zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub adjusted: usize,
    pub failed: usize,
}

/// Whether one position's remove-then-readd sequence ran to completion.
/// An aborted sequence already logged its reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdjustOutcome {
    Completed,
    Aborted,
}

/// Restores the BidAsk shape of the positions neighboring the active
/// bucket.
///
/// Triggered by pool-crossing notifications and by a periodic tick; both
/// paths funnel into [`check_and_adjust_neighboring_pools`], which holds
/// the single in-flight slot for the whole sequence.
///
/// [`check_and_adjust_neighboring_pools`]: RebalanceCoordinator::check_and_adjust_neighboring_pools
pub struct RebalanceCoordinator {
    chain: Arc<RwLock<PoolChain>>,
    services: Arc<PoolServices>,
    signer: Arc<dyn WalletSigner>,
    discovery: Arc<dyn DiscoverySink>,
    adjusting: AtomicBool,
}

impl RebalanceCoordinator {
    pub fn new(
        chain: Arc<RwLock<PoolChain>>,
        services: Arc<PoolServices>,
        signer: Arc<dyn WalletSigner>,
        discovery: Arc<dyn DiscoverySink>,
    ) -> Self {
        Self {
            chain,
            services,
            signer,
            discovery,
            adjusting: AtomicBool::new(false),
        }
    }

    /// Check the neighbors of the active bucket and rebalance the
    /// non-compliant ones, serially. Returns the cycle's adjusted and
    /// failed counts; an aborted sequence counts as failed.
    ///
    /// A trigger that arrives while another run is in flight is logged and
    /// dropped. The position straddling the active bucket is never
    /// adjusted.
    pub async fn check_and_adjust_neighboring_pools(&self) -> Result<CycleSummary> {
        if self
            .adjusting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Rebalance already in flight, dropping trigger");
            return Ok(CycleSummary::default());
        }
        let _guard = AdjustingGuard(&self.adjusting);

        let report = {
            let chain = self.chain.read().await;
            let Some(bucket_id) = chain.current_bucket_id() else {
                info!("No market observation yet, skipping adjustment");
                return Ok(CycleSummary::default());
            };
            match check_neighboring_compliance(&chain) {
                Some(report) => report,
                None => {
                    info!(
                        bucket = bucket_id,
                        "Active bucket outside tracked pools, monitoring only"
                    );
                    return Ok(CycleSummary::default());
                }
            }
        };

        let targets: Vec<PositionCompliance> = [report.lower, report.higher]
            .into_iter()
            .flatten()
            .filter(|p| !p.compliant)
            .collect();

        let mut failed = 0usize;
        for target in &targets {
            match self.adjust_position(target).await {
                Ok(AdjustOutcome::Completed) => {}
                Ok(AdjustOutcome::Aborted) => failed += 1,
                Err(e) => {
                    failed += 1;
                    warn!(
                        position = %target.position,
                        error = %e,
                        "Adjustment failed, leaving position for the next cycle"
                    );
                }
            }
        }

        let summary = CycleSummary {
            adjusted: targets.len() - failed,
            failed,
        };
        info!(
            pool = %report.pool,
            bucket = report.active_bucket_id,
            adjusted = summary.adjusted,
            failed = summary.failed,
            "Rebalance cycle complete"
        );

        let rows = {
            let chain = self.chain.read().await;
            pool_rows(&chain)
        };
        self.discovery.update_pools_data(rows).await;
        Ok(summary)
    }

    /// Withdraw everything from one position and re-deposit the same
    /// totals over the same range, shaped toward its side.
    async fn adjust_position(&self, target: &PositionCompliance) -> Result<AdjustOutcome> {
        let service = self
            .services
            .get(&target.pool)
            .with_context(|| format!("no gateway registered for pool {}", target.pool))?;

        // Capture totals before removal; the rebalance preserves capital
        // and only reshapes its distribution.
        let (range, total_x, total_y) = {
            let chain = self.chain.read().await;
            let position = chain
                .pool(&target.pool)
                .and_then(|pool| pool.position(&target.position))
                .context("position missing from chain")?;
            let range = position.bucket_range().context("position has no buckets")?;
            let total_x = u64::try_from(position.total_x()).context("X total exceeds u64")?;
            let total_y = u64::try_from(position.total_y()).context("Y total exceeds u64")?;
            (range, total_x, total_y)
        };

        info!(
            position = %target.position,
            range = %range,
            side = %target.side,
            total_x,
            total_y,
            "Rebalancing position"
        );

        let removed = match service.remove_liquidity(&target.position, range).await {
            Ok(intent) => self.signer.sign_and_submit(intent).await,
            Err(e) => Err(e),
        };
        if let Err(e) = removed {
            warn!(
                position = %target.position,
                error = %e,
                "Removal failed, skipping re-add"
            );
            self.refresh_position(&service, target).await;
            return Ok(AdjustOutcome::Aborted);
        }
        info!(position = %target.position, "Liquidity removed");

        let added = match service
            .add_liquidity_with_strategy(&target.position, range, total_x, total_y, target.side)
            .await
        {
            Ok(intent) => self.signer.sign_and_submit(intent).await,
            Err(e) => Err(e),
        };
        let outcome = match added {
            Ok(_) => {
                info!(position = %target.position, "Liquidity re-added");
                AdjustOutcome::Completed
            }
            Err(e) => {
                warn!(
                    position = %target.position,
                    error = %e,
                    "Re-add failed, capital sits uninvested until the next cycle"
                );
                AdjustOutcome::Aborted
            }
        };

        self.refresh_position(&service, target).await;
        Ok(outcome)
    }

    /// Re-fetch the position's buckets so later compliance checks work on
    /// ledger-true state. Runs whether or not the adjustment succeeded.
    async fn refresh_position(&self, service: &Arc<dyn PoolService>, target: &PositionCompliance) {
        let owner = self.signer.public_identity();
        match service.positions_for_owner(&owner).await {
            Ok(raw_positions) => {
                let Some(raw) = raw_positions
                    .into_iter()
                    .find(|p| p.address == target.position)
                else {
                    warn!(position = %target.position, "Position missing from refresh payload");
                    return;
                };
                let buckets = parse_buckets(&raw.buckets);
                let mut chain = self.chain.write().await;
                if let Some(position) = chain
                    .pool_mut(&target.pool)
                    .and_then(|pool| pool.position_mut(&target.position))
                {
                    position.replace_buckets(buckets);
                }
            }
            Err(e) => {
                warn!(position = %target.position, error = %e, "Position refresh failed");
            }
        }
    }
}
