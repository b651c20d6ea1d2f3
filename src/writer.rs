// src/writer.rs
//! Materializes parsed events into transaction records and per-user totals.

use alloy::primitives::{Log, U256};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::amount::{self, Token};
use crate::constants::{to_hex, TrackedTokens, NATIVE_DECIMALS, USD_DECIMALS};
use crate::correlator::{self, Correlation, Direction};
use crate::error::{AmountError, ProcessError};
use crate::models::{ParsedEvent, TotalsRecord, TransactionRecord, TxType, User};
use crate::store::Store;

fn decimal_or_zero(raw: Option<U256>, decimals: u32) -> Result<Decimal, AmountError> {
    match raw {
        Some(raw) => amount::to_decimal(raw, decimals, decimals),
        None => Ok(Decimal::ZERO),
    }
}

fn record(
    parsed: &ParsedEvent,
    token: Token,
    coin_amount: Decimal,
    usd_amount: Decimal,
    factor: Decimal,
) -> TransactionRecord {
    TransactionRecord {
        id: parsed.id.clone(),
        contract_address: to_hex(parsed.contract_address),
        block: parsed.block as i64,
        timestamp: parsed.timestamp as i64,
        token: token.symbol().to_string(),
        kind: parsed.kind,
        hash: to_hex(parsed.hash),
        user_address: parsed.user_key(),
        from_address: to_hex(parsed.from_address),
        to_address: to_hex(parsed.to_address),
        coin_amount,
        usd_amount,
        factor,
        pool_id: parsed.pool_id,
    }
}

/// Create the attributed user on first sight. Anonymous events have none.
fn ensure_user<S: Store>(store: &mut S, parsed: &ParsedEvent) -> Result<(), ProcessError> {
    let id = parsed.user_key();
    if id.is_empty() {
        return Ok(());
    }
    if store.load_user(&id)?.is_none() {
        store.save_user(&User { id })?;
    }
    Ok(())
}

fn expect_kind(parsed: &ParsedEvent, allowed: &[TxType]) -> Result<(), ProcessError> {
    if allowed.contains(&parsed.kind) {
        Ok(())
    } else {
        Err(ProcessError::WrongWriter {
            kind: parsed.kind.to_string(),
            id: parsed.id.clone(),
        })
    }
}

/// Record a core deposit or withdrawal.
///
/// The coin amount comes from the event when it carries one, otherwise from
/// the tranche mint/burn among `logs`. A missing companion log is reported and
/// recorded as zero.
pub fn write_core_transaction<S: Store>(
    store: &mut S,
    parsed: &ParsedEvent,
    logs: &[Log],
    token: Token,
    tokens: &TrackedTokens,
) -> Result<TransactionRecord, ProcessError> {
    expect_kind(parsed, &[TxType::CoreDeposit, TxType::CoreWithdrawal])?;
    let factor = amount::factor_for_token(token.symbol())?;

    let coin_amount = match parsed.coin_amount {
        Some(raw) => amount::to_decimal(raw, NATIVE_DECIMALS, NATIVE_DECIMALS)?,
        None => {
            let direction =
                Direction::for_kind(parsed.kind).ok_or_else(|| ProcessError::WrongWriter {
                    kind: parsed.kind.to_string(),
                    id: parsed.id.clone(),
                })?;
            let found = correlator::correlate(logs, direction, tokens);
            if found == Correlation::Missing {
                warn!(
                    "{} coin amount not found from Transfer event through tx {}",
                    token,
                    to_hex(parsed.hash)
                );
            }
            found.amount()
        }
    };
    let usd_amount = decimal_or_zero(parsed.usd_amount, USD_DECIMALS)?;

    ensure_user(store, parsed)?;
    let tx = record(parsed, token, coin_amount, usd_amount, factor);
    store.save_transaction(&tx)?;
    debug!("Saved {} {} ({} {}, ${})", tx.kind, tx.id, tx.coin_amount, tx.token, tx.usd_amount);
    Ok(tx)
}

/// Record a staker deposit or withdrawal. The token comes from the pool id;
/// an event without one fails with [`AmountError::MissingPool`].
pub fn write_staker_transaction<S: Store>(
    store: &mut S,
    parsed: &ParsedEvent,
) -> Result<TransactionRecord, ProcessError> {
    expect_kind(parsed, &[TxType::StakerDeposit, TxType::StakerWithdrawal])?;
    let pool_id = parsed.pool_id.ok_or(AmountError::MissingPool)?;
    let token = amount::token_for_pool(pool_id)?;

    let coin_amount = decimal_or_zero(parsed.coin_amount, NATIVE_DECIMALS)?;
    let usd_amount = decimal_or_zero(parsed.usd_amount, USD_DECIMALS)?;

    ensure_user(store, parsed)?;
    let tx = record(parsed, token, coin_amount, usd_amount, token.factor());
    store.save_transaction(&tx)?;
    debug!("Saved {} {} (pool {}, {} {})", tx.kind, tx.id, pool_id, tx.coin_amount, tx.token);
    Ok(tx)
}

/// Record a mint, burn or transfer leg of a tranche token and add its USD
/// value to the user's totals.
///
/// Replaying an id that is already stored rewrites the record but leaves
/// the totals alone, so totals count every event exactly once.
pub fn write_transfer_transaction<S: Store>(
    store: &mut S,
    parsed: &ParsedEvent,
    token: Token,
) -> Result<TransactionRecord, ProcessError> {
    expect_kind(
        parsed,
        &[TxType::Deposit, TxType::Withdrawal, TxType::TransferIn, TxType::TransferOut],
    )?;
    if !matches!(token, Token::Gvt | Token::Pwrd) {
        return Err(ProcessError::UntrackedAsset(token.to_string()));
    }

    let coin_amount = decimal_or_zero(parsed.coin_amount, NATIVE_DECIMALS)?;
    let usd_amount = coin_amount
        .checked_div(token.factor())
        .ok_or(AmountError::Arithmetic)?;

    ensure_user(store, parsed)?;
    let tx = record(parsed, token, coin_amount, usd_amount, token.factor());

    let totals = if store.load_transaction(&tx.id)?.is_some() {
        debug!("Replayed {}, totals left unchanged", tx.id);
        None
    } else {
        let mut totals = get_or_create_totals(store, &tx.user_address)?;
        apply_to_totals(&mut totals, tx.kind, token, usd_amount)?;
        Some(totals)
    };
    store.commit_transfer(&tx, totals.as_ref())?;
    debug!("Saved {} {} ({} {})", tx.kind, tx.id, tx.coin_amount, tx.token);
    Ok(tx)
}

/// Load the user's totals, or all-zero totals if none were saved yet. The
/// caller saves the record once it is done mutating it.
pub fn get_or_create_totals<S: Store>(
    store: &S,
    user_address: &str,
) -> Result<TotalsRecord, ProcessError> {
    Ok(store
        .load_totals(user_address)?
        .unwrap_or_else(|| TotalsRecord::zero(user_address)))
}

/// Add `usd` to the added or removed sums of the tranche and the total.
pub fn apply_to_totals(
    totals: &mut TotalsRecord,
    kind: TxType,
    token: Token,
    usd: Decimal,
) -> Result<(), AmountError> {
    let add = |sum: &mut Decimal| -> Result<(), AmountError> {
        *sum = sum.checked_add(usd).ok_or(AmountError::Arithmetic)?;
        Ok(())
    };

    let (asset, total) = match (kind, token) {
        (TxType::Deposit | TxType::TransferIn, Token::Gvt) => {
            (&mut totals.added_gvt, &mut totals.added_total)
        }
        (TxType::Deposit | TxType::TransferIn, Token::Pwrd) => {
            (&mut totals.added_pwrd, &mut totals.added_total)
        }
        (TxType::Withdrawal | TxType::TransferOut, Token::Gvt) => {
            (&mut totals.removed_gvt, &mut totals.removed_total)
        }
        (TxType::Withdrawal | TxType::TransferOut, Token::Pwrd) => {
            (&mut totals.removed_pwrd, &mut totals.removed_total)
        }
        _ => return Ok(()),
    };
    add(asset)?;
    add(total)
}
