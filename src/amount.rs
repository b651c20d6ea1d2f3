// src/amount.rs
//! Fixed-point to decimal conversion and the static token tables.
//!
//! All scaling goes through `rust_decimal`, so a raw amount divided by its
//! decimal base is exact as long as it fits the 96-bit mantissa.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::AmountError;

const MAX_SCALE: u32 = 28;
const MANTISSA_BITS: usize = 96;

/// Every token the protocol records transactions for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Gvt,
    Pwrd,
    Gro,
    UniswapGvtGro,
    UniswapGroUsdc,
    CurvePwrd3crv,
    BalancerGroWeth,
}

impl Token {
    pub const ALL: [Token; 7] = [
        Token::Gvt,
        Token::Pwrd,
        Token::Gro,
        Token::UniswapGvtGro,
        Token::UniswapGroUsdc,
        Token::CurvePwrd3crv,
        Token::BalancerGroWeth,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Token::Gvt => "gvt",
            Token::Pwrd => "pwrd",
            Token::Gro => "gro",
            Token::UniswapGvtGro => "uniswap_gvt_gro",
            Token::UniswapGroUsdc => "uniswap_gro_usdc",
            Token::CurvePwrd3crv => "curve_pwrd3crv",
            Token::BalancerGroWeth => "balancer_gro_weth",
        }
    }

    /// Divisor turning token units into USD.
    pub fn factor(&self) -> Decimal {
        // Tranche tokens and pool LP tokens are all recorded at par; the
        // price-per-share oracle is not indexed.
        Decimal::ONE
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Token {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Token::ALL
            .into_iter()
            .find(|t| t.symbol() == s)
            .ok_or_else(|| AmountError::UnknownToken(s.to_string()))
    }
}

/// Convert a raw fixed-point amount into a decimal.
///
/// Returns `raw / 10^native_decimals` expressed at `target_decimals`
/// fractional digits. Narrowing truncates toward zero, widening pads with
/// zeros; neither goes through binary floating point.
pub fn to_decimal(
    raw: U256,
    native_decimals: u32,
    target_decimals: u32,
) -> Result<Decimal, AmountError> {
    if native_decimals > MAX_SCALE {
        return Err(AmountError::Precision(native_decimals));
    }
    if target_decimals > MAX_SCALE {
        return Err(AmountError::Precision(target_decimals));
    }
    if raw.bit_len() > MANTISSA_BITS {
        return Err(AmountError::Overflow(raw));
    }

    let mantissa = raw.to::<u128>() as i128;
    let mut value = Decimal::try_from_i128_with_scale(mantissa, native_decimals)
        .map_err(|_| AmountError::Overflow(raw))?;

    if target_decimals < native_decimals {
        value = value.round_dp_with_strategy(target_decimals, RoundingStrategy::ToZero);
    } else {
        value.rescale(target_decimals);
        if value.scale() != target_decimals {
            return Err(AmountError::Overflow(raw));
        }
    }
    Ok(value)
}

/// Inverse of [`to_decimal`]: the raw integer a decimal represents at
/// `decimals` fractional digits. Excess digits are truncated.
pub fn to_raw(value: Decimal, decimals: u32) -> Result<U256, AmountError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AmountError::Negative(value));
    }
    if decimals > MAX_SCALE {
        return Err(AmountError::Precision(decimals));
    }

    let mut scaled = value.round_dp_with_strategy(decimals, RoundingStrategy::ToZero);
    scaled.rescale(decimals);
    if scaled.scale() != decimals {
        // rescale gives up silently when the mantissa would overflow
        return Err(AmountError::Arithmetic);
    }
    Ok(U256::from(scaled.mantissa().unsigned_abs()))
}

/// Fixed divisor of a known token symbol.
pub fn factor_for_token(symbol: &str) -> Result<Decimal, AmountError> {
    symbol.parse::<Token>().map(|t| t.factor())
}

/// Token staked in an LP-token staker pool.
pub fn token_for_pool(pool_id: u32) -> Result<Token, AmountError> {
    let token = match pool_id {
        0 => Token::Gro,
        1 => Token::UniswapGvtGro,
        2 => Token::UniswapGroUsdc,
        3 => Token::Gvt,
        4 => Token::CurvePwrd3crv,
        5 => Token::BalancerGroWeth,
        6 => Token::Pwrd,
        other => return Err(AmountError::UnknownPool(other)),
    };
    Ok(token)
}

/// Underlying stablecoin a router withdrawal pays out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ShareClass {
    decimals: u32,
    /// USD per whole unit.
    price: Decimal,
}

fn share_class(token_index: u32) -> Result<ShareClass, AmountError> {
    let class = match token_index {
        // DAI
        0 => ShareClass { decimals: 18, price: Decimal::ONE },
        // USDC
        1 => ShareClass { decimals: 6, price: Decimal::ONE },
        // USDT
        2 => ShareClass { decimals: 6, price: Decimal::ONE },
        other => return Err(AmountError::UnknownShareIndex(other)),
    };
    Ok(class)
}

/// USD value of `shares` units of the stablecoin at `token_index`.
pub fn usd_value_of_shares(token_index: u32, shares: U256) -> Result<Decimal, AmountError> {
    let class = share_class(token_index)?;
    let units = to_decimal(shares, class.decimals, class.decimals)?;
    units.checked_mul(class.price).ok_or(AmountError::Arithmetic)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn to_decimal_is_exact() {
        let value = to_decimal(U256::from(1_500_000_000_000_000_000u128), 18, 18).unwrap();
        assert_eq!(value, dec("1.5"));
        assert_eq!(value.scale(), 18);

        let smallest = to_decimal(U256::from(1u8), 18, 18).unwrap();
        assert_eq!(smallest, dec("0.000000000000000001"));
    }

    #[test]
    fn to_decimal_truncates_when_narrowing() {
        let value = to_decimal(U256::from(123_456_789u64), 8, 2).unwrap();
        assert_eq!(value, dec("1.23"));
        assert_eq!(value.scale(), 2);

        let dust = to_decimal(U256::from(500_000_000u64), 18, 7).unwrap();
        assert!(dust.is_zero());
    }

    #[test]
    fn to_decimal_pads_when_widening() {
        let value = to_decimal(U256::from(500_000_000u64), 7, 18).unwrap();
        assert_eq!(value, dec("50"));
        assert_eq!(value.scale(), 18);
    }

    #[test]
    fn to_decimal_rejects_what_it_cannot_represent() {
        assert!(matches!(
            to_decimal(U256::MAX, 18, 18),
            Err(AmountError::Overflow(_))
        ));
        assert!(matches!(
            to_decimal(U256::from(1u8), 29, 18),
            Err(AmountError::Precision(29))
        ));
    }

    #[test]
    fn to_raw_inverts_to_decimal() {
        let raw = U256::from(1_000_000_000_000_000_000_000u128);
        let value = to_decimal(raw, 18, 18).unwrap();
        assert_eq!(to_raw(value, 18).unwrap(), raw);
        assert_eq!(to_raw(dec("12.5"), 6).unwrap(), U256::from(12_500_000u64));
        assert!(matches!(to_raw(dec("-1"), 18), Err(AmountError::Negative(_))));
    }

    #[test]
    fn factor_lookup() {
        assert_eq!(factor_for_token("pwrd").unwrap(), Decimal::ONE);
        assert_eq!(factor_for_token("gvt").unwrap(), Decimal::ONE);
        match factor_for_token("dai") {
            Err(AmountError::UnknownToken(symbol)) => assert_eq!(symbol, "dai"),
            other => panic!("expected unknown token, got {other:?}"),
        }
    }

    #[test]
    fn pool_lookup() {
        assert_eq!(token_for_pool(0).unwrap(), Token::Gro);
        assert_eq!(token_for_pool(3).unwrap(), Token::Gvt);
        assert_eq!(token_for_pool(6).unwrap(), Token::Pwrd);
        assert!(matches!(token_for_pool(7), Err(AmountError::UnknownPool(7))));
    }

    #[test]
    fn symbols_round_trip_through_from_str() {
        for token in Token::ALL {
            assert_eq!(token.symbol().parse::<Token>().unwrap(), token);
        }
    }

    #[test]
    fn share_value_respects_index_decimals() {
        let usdc = usd_value_of_shares(1, U256::from(2_500_000u64)).unwrap();
        assert_eq!(usdc, dec("2.5"));

        let dai = usd_value_of_shares(0, U256::from(2_500_000_000_000_000_000u128)).unwrap();
        assert_eq!(dai, dec("2.5"));

        assert!(matches!(
            usd_value_of_shares(9, U256::from(1u8)),
            Err(AmountError::UnknownShareIndex(9))
        ));
    }
}
