// src/classifier.rs
use crate::amount::{self, Token};
use crate::constants::{to_hex, TrackedTokens, USD_DECIMALS, ZERO_ADDRESS};
use crate::decoder::ProtocolEvent;
use crate::error::AmountError;
use crate::models::{EventMeta, ParsedEvent, TxType};

fn tranche(pwrd: bool) -> Token {
    if pwrd {
        Token::Pwrd
    } else {
        Token::Gvt
    }
}

/// Map a decoded event to the transactions it represents.
///
/// Mints and burns yield one event, transfers between two users yield an
/// incoming and an outgoing leg, approvals yield nothing.
pub fn classify(
    meta: &EventMeta,
    event: &ProtocolEvent,
    tokens: &TrackedTokens,
) -> Result<Vec<ParsedEvent>, AmountError> {
    let parsed = match *event {
        ProtocolEvent::Transfer { from, to, value } => {
            let token = tokens
                .token_at(meta.contract_address)
                .ok_or_else(|| AmountError::UnknownToken(to_hex(meta.contract_address)))?;

            if from == ZERO_ADDRESS {
                vec![ParsedEvent::transfer(meta, TxType::Deposit, to, from, to, value, token)]
            } else if to == ZERO_ADDRESS {
                vec![ParsedEvent::transfer(meta, TxType::Withdrawal, from, from, to, value, token)]
            } else {
                vec![
                    ParsedEvent::transfer(meta, TxType::TransferIn, to, from, to, value, token),
                    ParsedEvent::transfer(meta, TxType::TransferOut, from, from, to, value, token),
                ]
            }
        }
        ProtocolEvent::Approval { .. } => Vec::new(),
        ProtocolEvent::CoreDeposit { user, pwrd, usd_amount } => {
            vec![ParsedEvent::core_deposit(meta, user, usd_amount, tranche(pwrd))]
        }
        ProtocolEvent::CoreWithdrawal { user, pwrd, return_usd } => {
            vec![ParsedEvent::core_withdrawal(meta, user, return_usd, tranche(pwrd))]
        }
        ProtocolEvent::RouterWithdrawal {
            sender,
            token_index,
            tranche: senior,
            token_amount,
            calc_amount,
        } => {
            let usd = amount::usd_value_of_shares(token_index, calc_amount)?;
            let usd_raw = amount::to_raw(usd, USD_DECIMALS)?;
            vec![ParsedEvent::router_withdrawal(
                meta,
                sender,
                token_amount,
                usd_raw,
                tranche(senior),
            )]
        }
        ProtocolEvent::EmergencyWithdrawal { pwrd } => {
            vec![ParsedEvent::emergency_withdrawal(meta, tranche(pwrd))]
        }
        // USD value of staked amounts is not priced yet and stays at zero.
        ProtocolEvent::StakerDeposit { user, pool_id, amount } => {
            vec![ParsedEvent::staker_deposit(meta, user, pool_id, amount)]
        }
        ProtocolEvent::StakerWithdrawal { user, pool_id, amount } => {
            vec![ParsedEvent::staker_withdrawal(meta, user, pool_id, amount)]
        }
    };
    Ok(parsed)
}
