// src/error.rs
use alloy::primitives::U256;
use thiserror::Error;

/// Lookup and scaling failures. Any of these stops the current event.
#[derive(Debug, Error)]
pub enum AmountError {
    #[error("unknown token symbol `{0}`")]
    UnknownToken(String),

    #[error("unknown staker pool id {0}")]
    UnknownPool(u32),

    #[error("staker event carries no pool id")]
    MissingPool,

    #[error("unknown share index {0}")]
    UnknownShareIndex(u32),

    #[error("amount {0} does not fit a 96-bit decimal mantissa")]
    Overflow(U256),

    #[error("decimal precision {0} exceeds the supported maximum of 28")]
    Precision(u32),

    #[error("negative decimal {0} cannot become a raw token amount")]
    Negative(rust_decimal::Decimal),

    #[error("decimal arithmetic overflowed")]
    Arithmetic,
}

/// A log that carries a known signature but cannot be decoded as that event.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to decode {event}: {source}")]
    Abi {
        event: &'static str,
        #[source]
        source: alloy::sol_types::Error,
    },

    #[error("{field} of {event} does not fit in 32 bits")]
    OutOfRange {
        event: &'static str,
        field: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt {table} row `{id}`: {reason}")]
    Corrupt {
        table: &'static str,
        id: String,
        reason: String,
    },
}

/// Everything that can abort the processing of a single event.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{kind} event `{id}` reached the wrong writer")]
    WrongWriter { kind: String, id: String },

    #[error("event `{0}` has no token to attribute it to")]
    MissingToken(String),

    #[error("token `{0}` is not a tracked tranche")]
    UntrackedAsset(String),
}
