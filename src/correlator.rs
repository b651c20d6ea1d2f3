// src/correlator.rs
//! Recovers the coin amount of a core deposit or withdrawal from the
//! tranche token mint or burn emitted in the same transaction.

use alloy::primitives::{Address, Log, B256, U256};
use rust_decimal::Decimal;

use crate::amount::{self, Token};
use crate::constants::{
    TrackedTokens, CORRELATED_DECIMALS, TRANSFER_TOPIC, TRANSFER_TOPIC_COUNT, ZERO_ADDRESS,
};
use crate::models::TxType;

/// Which side of the companion transfer must be the zero address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Mint,
    Burn,
}

impl Direction {
    pub fn for_kind(kind: TxType) -> Option<Self> {
        match kind {
            TxType::CoreDeposit => Some(Direction::Mint),
            TxType::CoreWithdrawal => Some(Direction::Burn),
            _ => None,
        }
    }

    fn matches(&self, from: Address, to: Address) -> bool {
        match self {
            Direction::Mint => from == ZERO_ADDRESS,
            Direction::Burn => to == ZERO_ADDRESS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    Found {
        token: Token,
        /// Position of the companion log in the scanned list.
        position: usize,
        amount: Decimal,
    },
    Missing,
}

impl Correlation {
    pub fn amount(&self) -> Decimal {
        match self {
            Correlation::Found { amount, .. } => *amount,
            Correlation::Missing => Decimal::ZERO,
        }
    }
}

/// Address held by an indexed topic, rejecting words with dirty upper bytes.
fn topic_address(topic: &B256) -> Option<Address> {
    if topic[..12].iter().any(|b| *b != 0) {
        return None;
    }
    Some(Address::from_word(*topic))
}

fn transfer_value(data: &[u8]) -> Option<U256> {
    if data.len() != 32 {
        return None;
    }
    Some(U256::from_be_slice(data))
}

/// Scan `logs` in order for the first tracked-token Transfer matching
/// `direction`. Logs of any other shape are skipped, never an error.
pub fn correlate(logs: &[Log], direction: Direction, tokens: &TrackedTokens) -> Correlation {
    for (position, log) in logs.iter().enumerate() {
        let Some(token) = tokens.token_at(log.address) else {
            continue;
        };
        let topics = log.data.topics();
        if topics.len() != TRANSFER_TOPIC_COUNT || topics[0] != TRANSFER_TOPIC {
            continue;
        }
        let (Some(from), Some(to)) = (topic_address(&topics[1]), topic_address(&topics[2])) else {
            continue;
        };
        if !direction.matches(from, to) {
            continue;
        }
        let Some(value) = transfer_value(&log.data.data) else {
            continue;
        };
        // a value that cannot be represented does not qualify either
        let Ok(amount) = amount::to_decimal(value, CORRELATED_DECIMALS, CORRELATED_DECIMALS) else {
            continue;
        };
        return Correlation::Found {
            token,
            position,
            amount,
        };
    }
    Correlation::Missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi;
    use crate::constants::{GVT_ADDRESS, PWRD_ADDRESS};
    use alloy::primitives::{Bytes, LogData};
    use alloy::sol_types::SolEvent;

    fn user() -> Address {
        Address::repeat_byte(0x42)
    }

    fn transfer(token: Address, from: Address, to: Address, value: u64) -> Log {
        Log {
            address: token,
            data: abi::Transfer {
                from,
                to,
                value: U256::from(value),
            }
            .encode_log_data(),
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn finds_mint_for_deposit() {
        let logs = vec![
            transfer(PWRD_ADDRESS, user(), Address::repeat_byte(9), 1),
            transfer(PWRD_ADDRESS, ZERO_ADDRESS, user(), 500_000_000),
        ];
        let found = correlate(&logs, Direction::Mint, &TrackedTokens::default());
        assert_eq!(
            found,
            Correlation::Found {
                token: Token::Pwrd,
                position: 1,
                amount: dec("50"),
            }
        );
    }

    #[test]
    fn finds_burn_for_withdrawal() {
        let logs = vec![
            transfer(GVT_ADDRESS, ZERO_ADDRESS, user(), 1),
            transfer(GVT_ADDRESS, user(), ZERO_ADDRESS, 12_345_678),
        ];
        let found = correlate(&logs, Direction::Burn, &TrackedTokens::default());
        assert_eq!(found.amount(), dec("1.2345678"));
        assert!(matches!(found, Correlation::Found { token: Token::Gvt, position: 1, .. }));
    }

    #[test]
    fn first_qualifying_log_wins() {
        let logs = vec![
            transfer(GVT_ADDRESS, ZERO_ADDRESS, user(), 10_000_000),
            transfer(PWRD_ADDRESS, ZERO_ADDRESS, user(), 20_000_000),
        ];
        let found = correlate(&logs, Direction::Mint, &TrackedTokens::default());
        assert_eq!(found.amount(), dec("1"));
        assert!(matches!(found, Correlation::Found { position: 0, .. }));
    }

    #[test]
    fn missing_when_nothing_qualifies() {
        let logs = vec![
            // untracked token
            transfer(Address::repeat_byte(0x77), ZERO_ADDRESS, user(), 1),
            // wrong direction
            transfer(PWRD_ADDRESS, user(), ZERO_ADDRESS, 1),
        ];
        let found = correlate(&logs, Direction::Mint, &TrackedTokens::default());
        assert_eq!(found, Correlation::Missing);
        assert!(found.amount().is_zero());
        assert_eq!(
            correlate(&[], Direction::Burn, &TrackedTokens::default()),
            Correlation::Missing
        );
    }

    #[test]
    fn malformed_logs_do_not_qualify() {
        let good = transfer(PWRD_ADDRESS, ZERO_ADDRESS, user(), 30_000_000);
        let topics = good.data.topics().to_vec();

        // ERC721-style transfer with an indexed token id
        let mut four_topics = topics.clone();
        four_topics.push(B256::repeat_byte(1));
        let nft = Log::new_unchecked(PWRD_ADDRESS, four_topics, good.data.data.clone());

        // short data payload
        let short = Log::new_unchecked(PWRD_ADDRESS, topics.clone(), Bytes::from(vec![0u8; 31]));

        // address topic with dirty upper bytes
        let mut dirty = topics.clone();
        dirty[1] = B256::repeat_byte(0xff);
        let dirty = Log {
            address: PWRD_ADDRESS,
            data: LogData::new_unchecked(dirty, good.data.data.clone()),
        };

        let logs = vec![nft, short, dirty, good];
        let found = correlate(&logs, Direction::Mint, &TrackedTokens::default());
        assert_eq!(found.amount(), dec("3"));
        assert!(matches!(found, Correlation::Found { position: 3, .. }));
    }

    #[test]
    fn direction_only_for_core_types() {
        assert_eq!(Direction::for_kind(TxType::CoreDeposit), Some(Direction::Mint));
        assert_eq!(Direction::for_kind(TxType::CoreWithdrawal), Some(Direction::Burn));
        assert_eq!(Direction::for_kind(TxType::Deposit), None);
    }
}
