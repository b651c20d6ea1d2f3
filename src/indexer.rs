use std::collections::HashMap;

use alloy::primitives::{Log, B256};
use eyre::Result;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::config::Config;
use crate::db::SqliteStore;
use crate::pipeline::{IndexedLog, Pipeline};
use crate::rpc::{RpcClient, RpcLog};

/// Poll the chain and feed every watched log to the pipeline in block and
/// log-index order, checkpointing after each fully handled batch.
pub async fn run(cfg: Config, store: SqliteStore) -> Result<()> {
    let rpc = RpcClient::new(&cfg.rpc_http_url)?;
    let watched = cfg.watched_addresses();
    let mut retry_delay = cfg.poll_interval_secs.max(1);

    let mut next_block = match store.load_checkpoint()? {
        Some(last) => last + 1,
        None => cfg.start_block,
    };
    let mut pipeline = Pipeline::new(store, cfg.tracked_tokens());

    info!(
        "Indexer started at block {} watching {} contracts",
        next_block,
        watched.len()
    );

    loop {
        match rpc.block_number().await {
            Ok(latest_block) => {
                retry_delay = cfg.poll_interval_secs.max(1);
                let target_block = latest_block.saturating_sub(cfg.confirmations);

                while next_block <= target_block {
                    let to_block = (next_block + cfg.batch_size - 1).min(target_block);
                    match index_range(&rpc, &mut pipeline, &watched, next_block, to_block).await {
                        Ok(written) => {
                            pipeline.store_mut().save_checkpoint(to_block)?;
                            info!(
                                "Indexed blocks {} → {}: {} transactions",
                                next_block, to_block, written
                            );
                            next_block = to_block + 1;
                        }
                        Err(e) => {
                            warn!(
                                "Batch {} → {} failed, will retry: {:?}",
                                next_block, to_block, e
                            );
                            retry_delay = (retry_delay * 2).min(120);
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("RPC failed this round: {:?}", e);
                retry_delay = (retry_delay * 2).min(120);
            }
        }

        sleep(Duration::from_secs(retry_delay)).await;
    }
}

/// Fetch and handle one inclusive block range. Returns the number of
/// transaction records written.
async fn index_range(
    rpc: &RpcClient,
    pipeline: &mut Pipeline<SqliteStore>,
    watched: &[alloy::primitives::Address],
    from_block: u64,
    to_block: u64,
) -> Result<usize> {
    let mut raw: Vec<(u64, u64, RpcLog)> = Vec::new();
    for log in rpc.logs(watched, from_block, to_block).await? {
        raw.push((log.block_number()?, log.log_index()?, log));
    }
    raw.sort_by_key(|(block, index, _)| (*block, *index));

    let mut timestamps: HashMap<u64, u64> = HashMap::new();
    let mut receipts: HashMap<B256, Vec<Log>> = HashMap::new();
    let mut written = 0;

    for (block, _, log) in raw {
        let timestamp = match timestamps.get(&block) {
            Some(ts) => *ts,
            None => {
                let ts = rpc.block_timestamp(block).await?;
                timestamps.insert(block, ts);
                ts
            }
        };
        let indexed: IndexedLog = log.into_indexed(timestamp)?;

        // only core events need the rest of their transaction
        let needs_receipt =
            matches!(pipeline.decode(&indexed.log), Ok(Some(ev)) if ev.needs_receipt());
        let siblings: &[Log] = if needs_receipt {
            let hash = indexed.meta.tx_hash;
            if !receipts.contains_key(&hash) {
                let logs = rpc.receipt_logs(hash).await?;
                receipts.insert(hash, logs);
            }
            receipts.get(&hash).map(Vec::as_slice).unwrap_or(&[])
        } else {
            &[]
        };

        // a store failure fails the batch so it is retried before the checkpoint
        written += pipeline.handle(&indexed, siblings)?.len();
    }

    Ok(written)
}
