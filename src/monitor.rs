//! Price/bin monitoring loop.
//!
//! The monitor polls the active bucket at a fixed interval, records each
//! observation on the shared chain and raises pool-crossing and
//! price-change notifications. It keeps polling while a rebalance is in
//! flight; the coordinator's own guard prevents compounding actions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use anchor_client::solana_sdk::pubkey::Pubkey;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::events::{HandlerList, PoolCrossed, PriceChanged};
use crate::registry::pool_containing;
use crate::service::{PoolService, PoolServices};
use crate::state::PoolChain;

const IDLE: u8 = 0;
const MONITORING: u8 = 1;
const STOPPED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Monitoring,
    Stopped,
}

/// Polls the active bucket and raises notifications on changes.
///
/// Lifecycle is `Idle -> Monitoring -> Stopped`; repeated starts and stops
/// are no-ops, and a stopped monitor stays stopped. The loop observes the
/// state flag at iteration boundaries only, so an in-flight refresh always
/// completes.
pub struct PriceMonitor {
    chain: Arc<RwLock<PoolChain>>,
    services: Arc<PoolServices>,
    poll_interval: Duration,
    state: AtomicU8,
    price_changed: HandlerList<PriceChanged>,
    pool_crossed: HandlerList<PoolCrossed>,
}

impl PriceMonitor {
    pub fn new(
        chain: Arc<RwLock<PoolChain>>,
        services: Arc<PoolServices>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            chain,
            services,
            poll_interval,
            state: AtomicU8::new(IDLE),
            price_changed: HandlerList::new(),
            pool_crossed: HandlerList::new(),
        }
    }

    pub fn state(&self) -> MonitorState {
        match self.state.load(Ordering::SeqCst) {
            MONITORING => MonitorState::Monitoring,
            STOPPED => MonitorState::Stopped,
            _ => MonitorState::Idle,
        }
    }

    pub fn on_price_changed<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&PriceChanged) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.price_changed.register(name, handler);
    }

    pub fn on_pool_crossed<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&PoolCrossed) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.pool_crossed.register(name, handler);
    }

    /// Transition to Monitoring and spawn the polling loop. Ignored unless
    /// the monitor is Idle.
    pub fn start_monitoring(self: &Arc<Self>) {
        if self
            .state
            .compare_exchange(IDLE, MONITORING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Monitor start ignored; already started or stopped");
            return;
        }

        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            info!(
                interval_secs = monitor.poll_interval.as_secs(),
                "Price monitoring started"
            );
            monitor.refresh_price().await;
            loop {
                tokio::time::sleep(monitor.poll_interval).await;
                if monitor.state.load(Ordering::SeqCst) != MONITORING {
                    break;
                }
                monitor.refresh_price().await;
            }
            info!("Price monitoring stopped");
        });
    }

    /// Transition to Stopped; the loop exits at its next iteration
    /// boundary.
    pub fn stop_monitoring(&self) {
        if self.state.swap(STOPPED, Ordering::SeqCst) == MONITORING {
            info!("Stopping price monitor");
        }
    }

    /// The gateway to poll: the current pool's if one contains the last
    /// observed bucket, otherwise the first registered gateway.
    async fn price_source(&self) -> Option<(Pubkey, Arc<dyn PoolService>)> {
        let current_pool = {
            let chain = self.chain.read().await;
            chain
                .current_bucket_id()
                .and_then(|id| pool_containing(&chain, id))
                .map(|p| p.address())
        };
        current_pool
            .and_then(|pool| self.services.get(&pool).map(|service| (pool, service)))
            .or_else(|| self.services.first())
    }

    /// Run one refresh: query the active bucket, record it, and raise
    /// notifications for any change. Query failures keep the previous
    /// observation and never kill the loop.
    pub async fn refresh_price(&self) {
        let Some((source_pool, service)) = self.price_source().await else {
            warn!("No pool gateways registered");
            return;
        };

        let active = match service.active_bucket().await {
            Ok(active) => active,
            Err(e) => {
                warn!(
                    pool = %source_pool,
                    error = %e,
                    "Active bucket query failed, keeping previous observation"
                );
                return;
            }
        };

        let transition = {
            let mut chain = self.chain.write().await;
            match chain.record_observation(active.id, active.price) {
                // First observation seeds the chain without notifications.
                None => None,
                Some(previous) if previous == active.id => None,
                Some(previous) => {
                    let from_pool = pool_containing(&chain, previous).map(|p| p.address());
                    let to_pool = pool_containing(&chain, active.id).map(|p| p.address());
                    Some((previous, from_pool, to_pool))
                }
            }
        };

        if let Some((previous_bucket_id, from_pool, to_pool)) = transition {
            if from_pool != to_pool {
                info!(
                    bucket = active.id,
                    ?from_pool,
                    ?to_pool,
                    "Active bucket crossed a pool boundary"
                );
                self.pool_crossed.emit(&PoolCrossed {
                    from_pool,
                    to_pool,
                    bucket_id: active.id,
                });
            }
            self.price_changed.emit(&PriceChanged {
                previous_bucket_id,
                bucket_id: active.id,
                price: active.price,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::state::{Bucket, Pool, Position, TokenMeta};
    use crate::testing::ScriptedPoolService;

    fn pool_covering(min: i32, max: i32) -> Pool {
        Pool::new(
            Pubkey::new_unique(),
            TokenMeta::new("X", 9),
            TokenMeta::new("Y", 6),
            vec![Position::new(
                Pubkey::new_unique(),
                Pubkey::new_unique(),
                vec![Bucket::new(min, 1, 1), Bucket::new(max, 1, 1)],
            )],
        )
    }

    fn monitor_over(
        pools: Vec<Pool>,
    ) -> (Arc<PriceMonitor>, Arc<RwLock<PoolChain>>, Arc<ScriptedPoolService>) {
        let first_pool = pools[0].address();
        let chain = Arc::new(RwLock::new(PoolChain::new(pools)));
        let service = Arc::new(ScriptedPoolService::new());
        let mut services = PoolServices::new();
        services.insert(first_pool, service.clone());
        let monitor = Arc::new(PriceMonitor::new(
            Arc::clone(&chain),
            Arc::new(services),
            Duration::from_secs(5),
        ));
        (monitor, chain, service)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_stop_are_idempotent() {
        let chain = Arc::new(RwLock::new(PoolChain::new(Vec::new())));
        let monitor = Arc::new(PriceMonitor::new(
            chain,
            Arc::new(PoolServices::new()),
            Duration::from_secs(5),
        ));
        assert_eq!(monitor.state(), MonitorState::Idle);

        monitor.start_monitoring();
        monitor.start_monitoring();
        assert_eq!(monitor.state(), MonitorState::Monitoring);

        monitor.stop_monitoring();
        monitor.stop_monitoring();
        assert_eq!(monitor.state(), MonitorState::Stopped);

        // A stopped monitor does not restart.
        monitor.start_monitoring();
        assert_eq!(monitor.state(), MonitorState::Stopped);
    }

    #[tokio::test]
    async fn test_first_observation_seeds_without_events() {
        let (monitor, chain, service) = monitor_over(vec![pool_covering(0, 10)]);
        service.push_active(7, 1.0);

        let events = Arc::new(Mutex::new(Vec::<String>::new()));
        let log = Arc::clone(&events);
        monitor.on_price_changed("log", move |_| {
            log.lock().unwrap().push("price".into());
            Ok(())
        });
        let log = Arc::clone(&events);
        monitor.on_pool_crossed("log", move |_| {
            log.lock().unwrap().push("cross".into());
            Ok(())
        });

        monitor.refresh_price().await;

        assert_eq!(chain.read().await.current_bucket_id(), Some(7));
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bucket_change_within_pool_raises_price_change_only() {
        let (monitor, _, service) = monitor_over(vec![pool_covering(0, 10)]);
        service.push_active(7, 1.0);
        service.push_active(8, 1.1);

        let price_events = Arc::new(Mutex::new(Vec::<PriceChanged>::new()));
        let crossings = Arc::new(Mutex::new(0usize));
        let seen = Arc::clone(&price_events);
        monitor.on_price_changed("capture", move |e| {
            seen.lock().unwrap().push(*e);
            Ok(())
        });
        let count = Arc::clone(&crossings);
        monitor.on_pool_crossed("count", move |_| {
            *count.lock().unwrap() += 1;
            Ok(())
        });

        monitor.refresh_price().await;
        monitor.refresh_price().await;

        let events = price_events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].previous_bucket_id, 7);
        assert_eq!(events[0].bucket_id, 8);
        assert_eq!(*crossings.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_crossing_raised_before_price_change() {
        let pool_a = pool_covering(0, 10);
        let pool_b = pool_covering(11, 20);
        let (a_addr, b_addr) = (pool_a.address(), pool_b.address());
        let (monitor, _, service) = monitor_over(vec![pool_a, pool_b]);
        service.push_active(10, 1.0);
        service.push_active(11, 1.1);

        let order = Arc::new(Mutex::new(Vec::<String>::new()));
        let log = Arc::clone(&order);
        monitor.on_price_changed("order", move |_| {
            log.lock().unwrap().push("price".into());
            Ok(())
        });
        let log = Arc::clone(&order);
        let crossing = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&crossing);
        monitor.on_pool_crossed("order", move |e| {
            log.lock().unwrap().push("cross".into());
            *seen.lock().unwrap() = Some(*e);
            Ok(())
        });

        monitor.refresh_price().await;
        monitor.refresh_price().await;

        assert_eq!(*order.lock().unwrap(), vec!["cross", "price"]);
        let crossed = crossing.lock().unwrap().unwrap();
        assert_eq!(crossed.from_pool, Some(a_addr));
        assert_eq!(crossed.to_pool, Some(b_addr));
        assert_eq!(crossed.bucket_id, 11);
    }

    #[tokio::test]
    async fn test_crossing_out_of_all_ranges_reports_no_destination() {
        let pool = pool_covering(0, 10);
        let addr = pool.address();
        let (monitor, chain, service) = monitor_over(vec![pool]);
        service.push_active(5, 1.0);
        service.push_active(99, 2.0);

        let crossing = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&crossing);
        monitor.on_pool_crossed("capture", move |e| {
            *seen.lock().unwrap() = Some(*e);
            Ok(())
        });

        monitor.refresh_price().await;
        monitor.refresh_price().await;

        let crossed = crossing.lock().unwrap().unwrap();
        assert_eq!(crossed.from_pool, Some(addr));
        assert_eq!(crossed.to_pool, None);
        assert_eq!(chain.read().await.current_bucket_id(), Some(99));
    }

    #[tokio::test]
    async fn test_failed_query_keeps_previous_observation() {
        let (monitor, chain, service) = monitor_over(vec![pool_covering(0, 10)]);
        service.push_active(7, 1.0);
        service.push_active_error("gateway down");

        let crossings = Arc::new(Mutex::new(0usize));
        let count = Arc::clone(&crossings);
        monitor.on_pool_crossed("count", move |_| {
            *count.lock().unwrap() += 1;
            Ok(())
        });

        monitor.refresh_price().await;
        monitor.refresh_price().await;

        let chain = chain.read().await;
        assert_eq!(chain.current_bucket_id(), Some(7));
        assert_eq!(chain.current_price(), Some(1.0));
        assert_eq!(*crossings.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_same_bucket_updates_price_display_only() {
        let (monitor, chain, service) = monitor_over(vec![pool_covering(0, 10)]);
        service.push_active(7, 1.0);
        service.push_active(7, 1.5);

        let price_events = Arc::new(Mutex::new(0usize));
        let count = Arc::clone(&price_events);
        monitor.on_price_changed("count", move |_| {
            *count.lock().unwrap() += 1;
            Ok(())
        });

        monitor.refresh_price().await;
        monitor.refresh_price().await;

        assert_eq!(chain.read().await.current_price(), Some(1.5));
        assert_eq!(*price_events.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_polls_current_pool_gateway_over_first() {
        let pool_a = pool_covering(0, 10);
        let pool_b = pool_covering(11, 20);
        let (a_addr, b_addr) = (pool_a.address(), pool_b.address());

        let chain = Arc::new(RwLock::new(PoolChain::new(vec![pool_a, pool_b])));
        chain.write().await.record_observation(15, 1.0);

        let service_a = Arc::new(ScriptedPoolService::new());
        let service_b = Arc::new(ScriptedPoolService::new());
        service_b.push_active(16, 1.1);
        let mut services = PoolServices::new();
        services.insert(a_addr, service_a.clone());
        services.insert(b_addr, service_b.clone());

        let monitor = PriceMonitor::new(chain, Arc::new(services), Duration::from_secs(5));
        monitor.refresh_price().await;

        assert_eq!(service_a.active_calls(), 0);
        assert_eq!(service_b.active_calls(), 1);
    }
}
