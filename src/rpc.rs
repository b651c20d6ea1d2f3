// src/rpc.rs
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, Log, B256};
use eyre::{eyre, Result, WrapErr};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::models::EventMeta;
use crate::pipeline::IndexedLog;

const RETRIES: u32 = 3;

#[derive(Debug, Deserialize, Clone)]
pub struct RpcLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,

    #[serde(rename = "blockNumber")]
    pub block_number_hex: String,

    #[serde(rename = "transactionHash")]
    pub tx_hash: String,

    #[serde(rename = "logIndex")]
    pub log_index_hex: String,
}

impl RpcLog {
    pub fn block_number(&self) -> Result<u64> {
        parse_quantity(&self.block_number_hex)
    }

    pub fn log_index(&self) -> Result<u64> {
        parse_quantity(&self.log_index_hex)
    }

    /// Convert into a primitive log; odd topic counts are kept as-is.
    pub fn to_log(&self) -> Result<Log> {
        let address = Address::from_str(&self.address).wrap_err("bad log address")?;
        let topics = self
            .topics
            .iter()
            .map(|t| B256::from_str(t).wrap_err_with(|| format!("bad topic {t}")))
            .collect::<Result<Vec<_>>>()?;
        let data = hex::decode(self.data.trim_start_matches("0x")).wrap_err("bad log data")?;
        Ok(Log::new_unchecked(address, topics, Bytes::from(data)))
    }

    pub fn into_indexed(self, timestamp: u64) -> Result<IndexedLog> {
        let log = self.to_log()?;
        let meta = EventMeta {
            tx_hash: B256::from_str(&self.tx_hash).wrap_err("bad transaction hash")?,
            log_index: self.log_index()?,
            block_number: self.block_number()?,
            timestamp,
            contract_address: log.address,
        };
        Ok(IndexedLog { meta, log })
    }
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct Receipt {
    logs: Vec<RpcLog>,
}

pub fn parse_quantity(hex: &str) -> Result<u64> {
    u64::from_str_radix(hex.trim_start_matches("0x"), 16)
        .wrap_err_with(|| format!("bad quantity {hex}"))
}

/// Minimal JSON-RPC client for the calls the indexer makes.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: Client,
    url: String,
}

impl RpcClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// POST one request, retrying transport failures with a fixed pause.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        for attempt in 1..=RETRIES {
            debug!("Sending {} to {}", method, self.url);
            match self.client.post(&self.url).json(&payload).send().await {
                Ok(resp) => {
                    if resp.status() != StatusCode::OK {
                        return Err(eyre!("RPC error: HTTP {} on {}", resp.status(), method));
                    }
                    let parsed: RpcResponse<T> = resp.json().await?;
                    if let Some(err) = parsed.error {
                        return Err(eyre!("RPC error {} on {}: {}", err.code, method, err.message));
                    }
                    return Ok(parsed.result);
                }
                Err(e) if attempt < RETRIES => {
                    warn!("{} failed (attempt {}): {}. Retrying...", method, attempt, e);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
                Err(e) => return Err(eyre!("{} failed after {} attempts: {}", method, RETRIES, e)),
            }
        }

        Err(eyre!("Unreachable: retries exhausted"))
    }

    pub async fn block_number(&self) -> Result<u64> {
        let hex: String = self
            .call("eth_blockNumber", json!([]))
            .await?
            .ok_or_else(|| eyre!("eth_blockNumber returned no result"))?;
        parse_quantity(&hex)
    }

    /// All logs emitted by `addresses` in the inclusive block range.
    pub async fn logs(
        &self,
        addresses: &[Address],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RpcLog>> {
        let addresses: Vec<String> = addresses.iter().map(crate::constants::to_hex).collect();
        let params = json!([{
            "fromBlock": format!("0x{:x}", from_block),
            "toBlock": format!("0x{:x}", to_block),
            "address": addresses,
        }]);
        Ok(self.call("eth_getLogs", params).await?.unwrap_or_default())
    }

    pub async fn block_timestamp(&self, block: u64) -> Result<u64> {
        let header: BlockHeader = self
            .call("eth_getBlockByNumber", json!([format!("0x{:x}", block), false]))
            .await?
            .ok_or_else(|| eyre!("block {} not found", block))?;
        parse_quantity(&header.timestamp)
    }

    /// Every log of a transaction, in emission order.
    pub async fn receipt_logs(&self, tx_hash: B256) -> Result<Vec<Log>> {
        let receipt: Receipt = self
            .call("eth_getTransactionReceipt", json!([crate::constants::to_hex(tx_hash)]))
            .await?
            .ok_or_else(|| eyre!("receipt of {} not found", tx_hash))?;
        receipt.logs.iter().map(RpcLog::to_log).collect()
    }
}
