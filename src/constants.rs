// src/constants.rs
use alloy::primitives::{address, Address, B256};
use alloy::sol_types::SolEvent;

use crate::abi;
use crate::amount::Token;

/// Mint source and burn destination.
pub const ZERO_ADDRESS: Address = Address::ZERO;

/// Default mainnet deployment of the junior tranche token.
pub const GVT_ADDRESS: Address = address!("3adb04e127b9c0a5d36094125669d4603ac52a0c");

/// Default mainnet deployment of the senior tranche token.
pub const PWRD_ADDRESS: Address = address!("f0a93d4994b3d98fb5e3a2f90dbc2d69073cb86b");

/// Precision of every on-chain token and USD amount the protocol emits.
pub const NATIVE_DECIMALS: u32 = 18;

pub const USD_DECIMALS: u32 = 18;

/// Normalisation applied to the value of a correlated mint/burn transfer.
pub const CORRELATED_DECIMALS: u32 = 7;

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: B256 = abi::Transfer::SIGNATURE_HASH;

/// Number of topics of a Transfer with both addresses indexed.
pub const TRANSFER_TOPIC_COUNT: usize = 3;

/// The two value tokens whose Transfer logs are indexed and correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedTokens {
    pub gvt: Address,
    pub pwrd: Address,
}

impl TrackedTokens {
    pub fn token_at(&self, address: Address) -> Option<Token> {
        if address == self.gvt {
            Some(Token::Gvt)
        } else if address == self.pwrd {
            Some(Token::Pwrd)
        } else {
            None
        }
    }

    pub fn contains(&self, address: Address) -> bool {
        self.token_at(address).is_some()
    }
}

impl Default for TrackedTokens {
    fn default() -> Self {
        Self {
            gvt: GVT_ADDRESS,
            pwrd: PWRD_ADDRESS,
        }
    }
}

/// Lowercase `0x`-prefixed hex of an address or hash.
pub fn to_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_topic_matches_erc20_signature() {
        assert_eq!(
            to_hex(TRANSFER_TOPIC),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn tracked_tokens_resolve_by_address() {
        let tokens = TrackedTokens::default();
        assert_eq!(tokens.token_at(GVT_ADDRESS), Some(Token::Gvt));
        assert_eq!(tokens.token_at(PWRD_ADDRESS), Some(Token::Pwrd));
        assert!(!tokens.contains(ZERO_ADDRESS));
    }

    #[test]
    fn hex_is_lowercase_and_prefixed() {
        assert_eq!(to_hex(PWRD_ADDRESS), "0xf0a93d4994b3d98fb5e3a2f90dbc2d69073cb86b");
    }
}
