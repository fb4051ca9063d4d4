use std::env;

use anchor_client::solana_sdk::pubkey::Pubkey;

pub struct Config {
    pub keypair_path: String,
    pub rpc_url: String,
    pub amm_api_url: String,
    pub pool_addresses: Vec<Pubkey>,
    pub poll_interval_secs: u64,
    pub adjust_interval_secs: u64,
    pub otlp_endpoint: Option<String>,
}

fn expand_tilde(path: &str) -> String {
    if path.starts_with("~/")
        && let Some(home) = env::var_os("HOME")
    {
        return format!("{}{}", home.to_string_lossy(), &path[1..]);
    }
    path.to_string()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let keypair_path =
            env::var("KEYPAIR_PATH").unwrap_or_else(|_| expand_tilde("~/.config/solana/id.json"));

        let rpc_url = env::var("RPC_URL").unwrap_or_else(|_| "http://127.0.0.1:8899".to_string());

        let amm_api_url =
            env::var("AMM_API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let pool_addresses = env::var("POOL_ADDRESSES")
            .map_err(|_| {
                anyhow::anyhow!("POOL_ADDRESSES must list the chain's pools, comma separated")
            })?
            .split(',')
            .map(|address| {
                address
                    .trim()
                    .parse::<Pubkey>()
                    .map_err(|e| anyhow::anyhow!("Invalid pool address {address}: {e}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        if pool_addresses.is_empty() {
            anyhow::bail!("POOL_ADDRESSES must name at least one pool");
        }

        let poll_interval_secs = env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u64>()?;

        let adjust_interval_secs = env::var("ADJUST_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()?;

        let otlp_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

        Ok(Self {
            keypair_path,
            rpc_url,
            amm_api_url,
            pool_addresses,
            poll_interval_secs,
            adjust_interval_secs,
            otlp_endpoint,
        })
    }
}
