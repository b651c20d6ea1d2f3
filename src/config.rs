use alloy::primitives::Address;
use dotenvy::dotenv;
use eyre::{Result, WrapErr};
use std::env;
use tracing::info;

use crate::constants::{TrackedTokens, GVT_ADDRESS, PWRD_ADDRESS};

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_http_url: String,
    pub db_path: String,
    pub confirmations: u64,
    /// First block to index when no checkpoint exists yet.
    pub start_block: u64,
    /// Blocks fetched per `eth_getLogs` request.
    pub batch_size: u64,
    pub poll_interval_secs: u64,
    pub gvt_address: Address,
    pub pwrd_address: Address,
    pub core_addresses: Vec<Address>,
    pub router_addresses: Vec<Address>,
    pub staker_addresses: Vec<Address>,
}

impl Config {
    pub fn tracked_tokens(&self) -> TrackedTokens {
        TrackedTokens {
            gvt: self.gvt_address,
            pwrd: self.pwrd_address,
        }
    }

    /// Every contract whose logs are fetched.
    pub fn watched_addresses(&self) -> Vec<Address> {
        let mut all = vec![self.gvt_address, self.pwrd_address];
        all.extend(&self.core_addresses);
        all.extend(&self.router_addresses);
        all.extend(&self.staker_addresses);
        all.sort();
        all.dedup();
        all
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_address(key: &str, value: Option<String>, default: Address) -> Result<Address> {
    match value {
        Some(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .wrap_err_with(|| format!("{key} is not an address: {v}")),
        _ => Ok(default),
    }
}

fn parse_address_list(key: &str, value: Option<String>) -> Result<Vec<Address>> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Address>()
                .wrap_err_with(|| format!("{key} contains an invalid address: {s}"))
        })
        .collect()
}

/// Build a config from any variable source. `load` uses the process
/// environment.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    // RPC URL (ETH_RPC alias)
    let rpc_http_url = lookup("RPC_HTTP_URL")
        .or_else(|| lookup("ETH_RPC"))
        .unwrap_or_else(|| "https://eth.llamarpc.com".to_string());

    // SQLite DB path (default: gro.db)
    let db_path = lookup("DATABASE_URL").unwrap_or_else(|| "gro.db".to_string());

    let cfg = Config {
        rpc_http_url,
        db_path,
        confirmations: parse_or(lookup("CONFIRMATIONS"), 12),
        start_block: parse_or(lookup("START_BLOCK"), 12_522_000),
        batch_size: parse_or(lookup("BATCH_SIZE"), 2_000u64).max(1),
        poll_interval_secs: parse_or(lookup("POLL_INTERVAL_SECS"), 15),
        gvt_address: parse_address("GVT_ADDRESS", lookup("GVT_ADDRESS"), GVT_ADDRESS)?,
        pwrd_address: parse_address("PWRD_ADDRESS", lookup("PWRD_ADDRESS"), PWRD_ADDRESS)?,
        core_addresses: parse_address_list("CORE_ADDRESSES", lookup("CORE_ADDRESSES"))?,
        router_addresses: parse_address_list("ROUTER_ADDRESSES", lookup("ROUTER_ADDRESSES"))?,
        staker_addresses: parse_address_list("STAKER_ADDRESSES", lookup("STAKER_ADDRESSES"))?,
    };
    Ok(cfg)
}

pub fn load() -> Result<Config> {
    dotenv().ok(); // Load from .env file

    let cfg = from_lookup(|key| env::var(key).ok())?;

    // Log loaded config for debugging
    info!("Loaded config: {:?}", cfg);

    Ok(cfg)
}
