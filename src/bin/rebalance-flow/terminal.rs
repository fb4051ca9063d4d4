use async_trait::async_trait;
use dlmm_chain_rebalancing::{DiscoverySink, PoolRow};

/// Prints each chain snapshot as a plain table, one line per pool. The
/// current pool is marked with `*` and carries the observation scalars.
pub struct TerminalSink;

#[async_trait]
impl DiscoverySink for TerminalSink {
    async fn update_pools_data(&self, rows: Vec<PoolRow>) {
        println!("Pool chain ({} pools):", rows.len());
        for row in &rows {
            let marker = if row.is_current { "*" } else { " " };
            let range = row
                .range
                .map(|r| r.to_string())
                .unwrap_or_else(|| "[no positions]".to_string());
            println!(
                "{} {} {} range {} positions {} reserves {:.4} / {:.4}",
                marker, row.pair, row.address, range, row.positions, row.total_x, row.total_y
            );
            if let (Some(bucket), Some(price)) = (row.active_bucket_id, row.price) {
                let observed = row
                    .observed_at
                    .map(|at| at.format(" observed %H:%M:%S UTC").to_string())
                    .unwrap_or_default();
                println!("    active bucket {bucket} price {price:.6}{observed}");
            }
        }
    }
}
