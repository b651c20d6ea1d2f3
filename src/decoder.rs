// src/decoder.rs
use alloy::primitives::{Address, Log, U256};
use alloy::sol_types::SolEvent;

use crate::abi::{self, legacy_staker};
use crate::constants::TrackedTokens;
use crate::error::DecodeError;

/// A log decoded into one of the event families the indexer consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    Transfer {
        from: Address,
        to: Address,
        value: U256,
    },
    Approval {
        owner: Address,
        spender: Address,
        value: U256,
    },
    CoreDeposit {
        user: Address,
        pwrd: bool,
        usd_amount: U256,
    },
    CoreWithdrawal {
        user: Address,
        pwrd: bool,
        return_usd: U256,
    },
    RouterWithdrawal {
        sender: Address,
        token_index: u32,
        tranche: bool,
        token_amount: U256,
        calc_amount: U256,
    },
    EmergencyWithdrawal {
        pwrd: bool,
    },
    StakerDeposit {
        user: Address,
        pool_id: Option<u32>,
        amount: U256,
    },
    StakerWithdrawal {
        user: Address,
        pool_id: Option<u32>,
        amount: U256,
    },
}

impl ProtocolEvent {
    /// Core deposits and withdrawals need the transaction's other logs to
    /// recover the coin amount.
    pub fn needs_receipt(&self) -> bool {
        matches!(self, ProtocolEvent::CoreDeposit { .. } | ProtocolEvent::CoreWithdrawal { .. })
    }
}

fn abi_err(event: &'static str) -> impl FnOnce(alloy::sol_types::Error) -> DecodeError {
    move |source| DecodeError::Abi { event, source }
}

fn small(value: U256, event: &'static str, field: &'static str) -> Result<u32, DecodeError> {
    u32::try_from(value).map_err(|_| DecodeError::OutOfRange { event, field })
}

/// Decode a raw log by its signature topic.
///
/// Returns `Ok(None)` for logs the indexer does not consume, including token
/// events emitted by contracts other than the tracked tranche tokens.
pub fn decode(log: &Log, tokens: &TrackedTokens) -> Result<Option<ProtocolEvent>, DecodeError> {
    let Some(topic0) = log.data.topics().first().copied() else {
        return Ok(None);
    };
    let data = &log.data;

    let event = if topic0 == abi::Transfer::SIGNATURE_HASH {
        if !tokens.contains(log.address) {
            return Ok(None);
        }
        let ev = abi::Transfer::decode_log_data(data).map_err(abi_err("Transfer"))?;
        ProtocolEvent::Transfer {
            from: ev.from,
            to: ev.to,
            value: ev.value,
        }
    } else if topic0 == abi::Approval::SIGNATURE_HASH {
        if !tokens.contains(log.address) {
            return Ok(None);
        }
        let ev = abi::Approval::decode_log_data(data).map_err(abi_err("Approval"))?;
        ProtocolEvent::Approval {
            owner: ev.owner,
            spender: ev.spender,
            value: ev.value,
        }
    } else if topic0 == abi::LogNewDeposit::SIGNATURE_HASH {
        let ev = abi::LogNewDeposit::decode_log_data(data).map_err(abi_err("LogNewDeposit"))?;
        ProtocolEvent::CoreDeposit {
            user: ev.user,
            pwrd: ev.pwrd,
            usd_amount: ev.usdAmount,
        }
    } else if topic0 == abi::LogNewWithdrawal::SIGNATURE_HASH {
        let ev = abi::LogNewWithdrawal::decode_log_data(data).map_err(abi_err("LogNewWithdrawal"))?;
        ProtocolEvent::CoreWithdrawal {
            user: ev.user,
            pwrd: ev.pwrd,
            return_usd: ev.returnUsd,
        }
    } else if topic0 == abi::LogEmergencyWithdrawal::SIGNATURE_HASH {
        let ev = abi::LogEmergencyWithdrawal::decode_log_data(data)
            .map_err(abi_err("LogEmergencyWithdrawal"))?;
        ProtocolEvent::EmergencyWithdrawal { pwrd: ev.pwrd }
    } else if topic0 == abi::LogWithdrawal::SIGNATURE_HASH {
        let ev = abi::LogWithdrawal::decode_log_data(data).map_err(abi_err("LogWithdrawal"))?;
        ProtocolEvent::RouterWithdrawal {
            sender: ev.sender,
            token_index: small(ev.tokenIndex, "LogWithdrawal", "tokenIndex")?,
            tranche: ev.tranche,
            token_amount: ev.tokenAmount,
            calc_amount: ev.calcAmount,
        }
    } else if topic0 == abi::LogDeposit::SIGNATURE_HASH {
        let ev = abi::LogDeposit::decode_log_data(data).map_err(abi_err("LogDeposit"))?;
        ProtocolEvent::StakerDeposit {
            user: ev.user,
            pool_id: Some(small(ev.pid, "LogDeposit", "pid")?),
            amount: ev.amount,
        }
    } else if topic0 == abi::LogWithdraw::SIGNATURE_HASH {
        let ev = abi::LogWithdraw::decode_log_data(data).map_err(abi_err("LogWithdraw"))?;
        ProtocolEvent::StakerWithdrawal {
            user: ev.user,
            pool_id: Some(small(ev.pid, "LogWithdraw", "pid")?),
            amount: ev.amount,
        }
    } else if topic0 == legacy_staker::LogDeposit::SIGNATURE_HASH {
        let ev = legacy_staker::LogDeposit::decode_log_data(data).map_err(abi_err("LogDeposit"))?;
        ProtocolEvent::StakerDeposit {
            user: ev.user,
            pool_id: None,
            amount: ev.amount,
        }
    } else if topic0 == legacy_staker::LogWithdraw::SIGNATURE_HASH {
        let ev = legacy_staker::LogWithdraw::decode_log_data(data).map_err(abi_err("LogWithdraw"))?;
        ProtocolEvent::StakerWithdrawal {
            user: ev.user,
            pool_id: None,
            amount: ev.amount,
        }
    } else {
        return Ok(None);
    };

    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{GVT_ADDRESS, PWRD_ADDRESS, ZERO_ADDRESS};

    fn log_of<E: SolEvent>(address: Address, event: &E) -> Log {
        Log {
            address,
            data: event.encode_log_data(),
        }
    }

    #[test]
    fn decodes_tracked_transfer() {
        let user = Address::repeat_byte(0x22);
        let log = log_of(
            PWRD_ADDRESS,
            &abi::Transfer {
                from: ZERO_ADDRESS,
                to: user,
                value: U256::from(10u8),
            },
        );
        let decoded = decode(&log, &TrackedTokens::default()).unwrap();
        assert_eq!(
            decoded,
            Some(ProtocolEvent::Transfer {
                from: ZERO_ADDRESS,
                to: user,
                value: U256::from(10u8),
            })
        );
    }

    #[test]
    fn ignores_transfers_of_other_tokens() {
        let log = log_of(
            Address::repeat_byte(0x99),
            &abi::Transfer {
                from: Address::repeat_byte(1),
                to: Address::repeat_byte(2),
                value: U256::from(1u8),
            },
        );
        assert_eq!(decode(&log, &TrackedTokens::default()).unwrap(), None);
    }

    #[test]
    fn decodes_core_deposit() {
        let user = Address::repeat_byte(0x33);
        let log = log_of(
            Address::repeat_byte(0x44),
            &abi::LogNewDeposit {
                user,
                referral: ZERO_ADDRESS,
                pwrd: true,
                usdAmount: U256::from(5u8),
                tokens: [U256::ZERO; 3],
            },
        );
        let decoded = decode(&log, &TrackedTokens::default()).unwrap().unwrap();
        assert!(decoded.needs_receipt());
        assert_eq!(
            decoded,
            ProtocolEvent::CoreDeposit {
                user,
                pwrd: true,
                usd_amount: U256::from(5u8),
            }
        );
    }

    #[test]
    fn legacy_staker_events_have_no_pool() {
        let user = Address::repeat_byte(0x55);
        let log = log_of(
            Address::repeat_byte(0x66),
            &legacy_staker::LogWithdraw {
                user,
                amount: U256::from(3u8),
            },
        );
        assert_eq!(
            decode(&log, &TrackedTokens::default()).unwrap(),
            Some(ProtocolEvent::StakerWithdrawal {
                user,
                pool_id: None,
                amount: U256::from(3u8),
            })
        );
    }

    #[test]
    fn oversized_pid_is_a_decode_error() {
        let log = log_of(
            Address::repeat_byte(0x66),
            &abi::LogDeposit {
                user: Address::repeat_byte(1),
                pid: U256::from(u64::MAX),
                amount: U256::from(1u8),
            },
        );
        assert!(matches!(
            decode(&log, &TrackedTokens::default()),
            Err(DecodeError::OutOfRange { field: "pid", .. })
        ));
    }

    #[test]
    fn truncated_payload_is_a_decode_error() {
        let mut log = log_of(
            GVT_ADDRESS,
            &abi::Transfer {
                from: Address::repeat_byte(1),
                to: Address::repeat_byte(2),
                value: U256::from(1u8),
            },
        );
        let topics = log.data.topics().to_vec();
        log.data = alloy::primitives::LogData::new_unchecked(topics, Default::default());
        assert!(matches!(
            decode(&log, &TrackedTokens::default()),
            Err(DecodeError::Abi { event: "Transfer", .. })
        ));
    }

    #[test]
    fn unknown_signatures_are_skipped() {
        let log = Log::new_unchecked(
            GVT_ADDRESS,
            vec![alloy::primitives::B256::repeat_byte(0x01)],
            Default::default(),
        );
        assert_eq!(decode(&log, &TrackedTokens::default()).unwrap(), None);
    }
}
