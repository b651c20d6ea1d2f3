// src/models.rs
use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, B256, U256};
use rust_decimal::Decimal;

use crate::amount::Token;
use crate::constants::{to_hex, ZERO_ADDRESS};

/// Semantic type of a recorded transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxType {
    Deposit,
    Withdrawal,
    TransferIn,
    TransferOut,
    CoreDeposit,
    CoreWithdrawal,
    StakerDeposit,
    StakerWithdrawal,
}

impl TxType {
    pub const ALL: [TxType; 8] = [
        TxType::Deposit,
        TxType::Withdrawal,
        TxType::TransferIn,
        TxType::TransferOut,
        TxType::CoreDeposit,
        TxType::CoreWithdrawal,
        TxType::StakerDeposit,
        TxType::StakerWithdrawal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Deposit => "deposit",
            TxType::Withdrawal => "withdrawal",
            TxType::TransferIn => "transfer_in",
            TxType::TransferOut => "transfer_out",
            TxType::CoreDeposit => "core_deposit",
            TxType::CoreWithdrawal => "core_withdrawal",
            TxType::StakerDeposit => "staker_deposit",
            TxType::StakerWithdrawal => "staker_withdrawal",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TxType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown transaction type `{s}`"))
    }
}

/// Position and origin of a decoded log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMeta {
    pub tx_hash: B256,
    pub log_index: u64,
    pub block_number: u64,
    pub timestamp: u64,
    pub contract_address: Address,
}

impl EventMeta {
    /// `<tx hash>-<log index>`, unique per log.
    pub fn base_id(&self) -> String {
        format!("{}-{}", to_hex(self.tx_hash), self.log_index)
    }
}

/// Normalized intermediate form of one classified event. Not persisted.
///
/// Amounts are raw on-chain integers. `None` means the amount is not carried
/// by the event: a core `coin_amount` is recovered from the transfer logs of
/// the same transaction, a staker `usd_amount` stays at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEvent {
    pub id: String,
    pub hash: B256,
    pub block: u64,
    pub timestamp: u64,
    pub contract_address: Address,
    pub kind: TxType,
    pub user_address: Option<Address>,
    pub from_address: Address,
    pub to_address: Address,
    pub coin_amount: Option<U256>,
    pub usd_amount: Option<U256>,
    pub pool_id: Option<u32>,
    pub token: Option<Token>,
}

impl ParsedEvent {
    fn base(meta: &EventMeta, kind: TxType) -> Self {
        Self {
            id: meta.base_id(),
            hash: meta.tx_hash,
            block: meta.block_number,
            timestamp: meta.timestamp,
            contract_address: meta.contract_address,
            kind,
            user_address: None,
            from_address: ZERO_ADDRESS,
            to_address: ZERO_ADDRESS,
            coin_amount: None,
            usd_amount: None,
            pool_id: None,
            token: None,
        }
    }

    /// Mint, burn or one leg of a plain token transfer. `kind` picks the
    /// leg; transfer legs get an `-in`/`-out` id suffix.
    pub fn transfer(
        meta: &EventMeta,
        kind: TxType,
        user: Address,
        from: Address,
        to: Address,
        value: U256,
        token: Token,
    ) -> Self {
        let mut ev = Self::base(meta, kind);
        match kind {
            TxType::TransferIn => ev.id.push_str("-in"),
            TxType::TransferOut => ev.id.push_str("-out"),
            _ => {}
        }
        ev.user_address = Some(user);
        ev.from_address = from;
        ev.to_address = to;
        ev.coin_amount = Some(value);
        ev.usd_amount = Some(value);
        ev.token = Some(token);
        ev
    }

    pub fn core_deposit(meta: &EventMeta, user: Address, usd_amount: U256, token: Token) -> Self {
        let mut ev = Self::base(meta, TxType::CoreDeposit);
        ev.user_address = Some(user);
        ev.to_address = user;
        ev.usd_amount = Some(usd_amount);
        ev.token = Some(token);
        ev
    }

    pub fn core_withdrawal(
        meta: &EventMeta,
        user: Address,
        usd_amount: U256,
        token: Token,
    ) -> Self {
        let mut ev = Self::base(meta, TxType::CoreWithdrawal);
        ev.user_address = Some(user);
        ev.from_address = user;
        ev.usd_amount = Some(usd_amount);
        ev.token = Some(token);
        ev
    }

    /// Router withdrawals carry both amounts, nothing to correlate.
    pub fn router_withdrawal(
        meta: &EventMeta,
        sender: Address,
        coin_amount: U256,
        usd_amount: U256,
        token: Token,
    ) -> Self {
        let mut ev = Self::core_withdrawal(meta, sender, usd_amount, token);
        ev.coin_amount = Some(coin_amount);
        ev
    }

    /// Forced exit without a user. Amounts are pinned at zero so the
    /// correlator never attributes a burn to it.
    pub fn emergency_withdrawal(meta: &EventMeta, token: Token) -> Self {
        let mut ev = Self::base(meta, TxType::CoreWithdrawal);
        ev.coin_amount = Some(U256::ZERO);
        ev.usd_amount = Some(U256::ZERO);
        ev.token = Some(token);
        ev
    }

    pub fn staker_deposit(
        meta: &EventMeta,
        user: Address,
        pool_id: Option<u32>,
        amount: U256,
    ) -> Self {
        let mut ev = Self::base(meta, TxType::StakerDeposit);
        ev.user_address = Some(user);
        ev.from_address = user;
        ev.to_address = meta.contract_address;
        ev.coin_amount = Some(amount);
        ev.pool_id = pool_id;
        ev
    }

    pub fn staker_withdrawal(
        meta: &EventMeta,
        user: Address,
        pool_id: Option<u32>,
        amount: U256,
    ) -> Self {
        let mut ev = Self::base(meta, TxType::StakerWithdrawal);
        ev.user_address = Some(user);
        ev.from_address = meta.contract_address;
        ev.to_address = user;
        ev.coin_amount = Some(amount);
        ev.pool_id = pool_id;
        ev
    }

    /// Attributed user as stored: lowercase hex, empty when unknown.
    pub fn user_key(&self) -> String {
        self.user_address.map(|a| to_hex(a)).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
}

/// Persisted transaction. Written once per event (or transfer leg).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: String,
    pub contract_address: String,
    pub block: i64,
    pub timestamp: i64,
    pub token: String,
    pub kind: TxType,
    pub hash: String,
    pub user_address: String,
    pub from_address: String,
    pub to_address: String,
    pub coin_amount: Decimal,
    pub usd_amount: Decimal,
    pub factor: Decimal,
    pub pool_id: Option<u32>,
}

/// Lifetime USD added and removed by one user. Never decreases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsRecord {
    pub user_address: String,
    pub added_gvt: Decimal,
    pub added_pwrd: Decimal,
    pub added_total: Decimal,
    pub removed_gvt: Decimal,
    pub removed_pwrd: Decimal,
    pub removed_total: Decimal,
}

impl TotalsRecord {
    pub fn zero(user_address: &str) -> Self {
        Self {
            user_address: user_address.to_string(),
            added_gvt: Decimal::ZERO,
            added_pwrd: Decimal::ZERO,
            added_total: Decimal::ZERO,
            removed_gvt: Decimal::ZERO,
            removed_pwrd: Decimal::ZERO,
            removed_total: Decimal::ZERO,
        }
    }
}
