// src/pipeline.rs
use alloy::primitives::Log;
use tracing::{debug, error};

use crate::classifier;
use crate::constants::{to_hex, TrackedTokens};
use crate::decoder::{self, ProtocolEvent};
use crate::error::{DecodeError, ProcessError, StoreError};
use crate::models::{EventMeta, TransactionRecord, TxType};
use crate::store::Store;
use crate::writer;

/// A raw log together with where it was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedLog {
    pub meta: EventMeta,
    pub log: Log,
}

/// Runs one log at a time through decode, classify and write.
pub struct Pipeline<S> {
    store: S,
    tokens: TrackedTokens,
}

impl<S: Store> Pipeline<S> {
    pub fn new(store: S, tokens: TrackedTokens) -> Self {
        Self { store, tokens }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn decode(&self, log: &Log) -> Result<Option<ProtocolEvent>, DecodeError> {
        decoder::decode(log, &self.tokens)
    }

    /// Classify `event` and write every transaction it yields. `siblings` are
    /// all logs of the same transaction, consulted only for core events that
    /// lack a coin amount.
    pub fn process(
        &mut self,
        meta: &EventMeta,
        event: &ProtocolEvent,
        siblings: &[Log],
    ) -> Result<Vec<TransactionRecord>, ProcessError> {
        let parsed = classifier::classify(meta, event, &self.tokens)?;

        let mut written = Vec::with_capacity(parsed.len());
        for ev in &parsed {
            let tx = match ev.kind {
                TxType::Deposit | TxType::Withdrawal | TxType::TransferIn | TxType::TransferOut => {
                    let token = ev.token.ok_or_else(|| ProcessError::MissingToken(ev.id.clone()))?;
                    writer::write_transfer_transaction(&mut self.store, ev, token)?
                }
                TxType::CoreDeposit | TxType::CoreWithdrawal => {
                    let token = ev.token.ok_or_else(|| ProcessError::MissingToken(ev.id.clone()))?;
                    writer::write_core_transaction(
                        &mut self.store,
                        ev,
                        siblings,
                        token,
                        &self.tokens,
                    )?
                }
                TxType::StakerDeposit | TxType::StakerWithdrawal => {
                    writer::write_staker_transaction(&mut self.store, ev)?
                }
            };
            written.push(tx);
        }
        Ok(written)
    }

    /// Handle one log end to end.
    ///
    /// Bad data (an undecodable log, an unknown pool, a missing token) is
    /// logged and contained to this log so later logs still get processed.
    /// Store failures are returned: the log has not been recorded and must be
    /// handled again.
    pub fn handle(
        &mut self,
        indexed: &IndexedLog,
        siblings: &[Log],
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let event = match self.decode(&indexed.log) {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!("Skipping unrecognised log {}", indexed.meta.base_id());
                return Ok(Vec::new());
            }
            Err(e) => {
                error!("Decode failed for log {}: {}", indexed.meta.base_id(), e);
                return Ok(Vec::new());
            }
        };

        match self.process(&indexed.meta, &event, siblings) {
            Ok(written) => Ok(written),
            Err(ProcessError::Store(e)) => Err(e),
            Err(e) => {
                error!(
                    "Dropping log {} of {} at block {}: {}",
                    indexed.meta.base_id(),
                    to_hex(indexed.meta.contract_address),
                    indexed.meta.block_number,
                    e
                );
                Ok(Vec::new())
            }
        }
    }
}
