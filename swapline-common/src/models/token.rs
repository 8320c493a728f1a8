use std::hash::{Hash, Hasher};

use alloy_primitives::Address;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::{Currency, Decimals};

/// On-chain metadata of an ERC-20 token as returned by `decimals()`, `symbol()` and `name()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub decimals: Decimals,
    pub symbol: String,
    pub name: String,
}

/// A token selected by the caller.
///
/// Two refs are equal if they denote the same currency, regardless of symbol or name.
#[derive(Debug, Clone, Serialize, Deserialize, Eq)]
pub struct TokenRef {
    pub currency: Currency,
    pub symbol: String,
    pub name: String,
    pub decimals: Decimals,
}

impl TokenRef {
    pub fn new(currency: Currency, symbol: &str, name: &str, decimals: Decimals) -> Self {
        Self { currency, symbol: symbol.to_string(), name: name.to_string(), decimals }
    }

    pub fn erc20(address: Address, metadata: TokenMetadata) -> Self {
        Self {
            currency: Currency::Token(address),
            symbol: metadata.symbol,
            name: metadata.name,
            decimals: metadata.decimals,
        }
    }

    /// The chain's native currency. EVM chains use 18 decimals.
    pub fn native(symbol: &str) -> Self {
        Self::new(Currency::Native, symbol, symbol, 18)
    }

    pub fn is_native(&self) -> bool {
        self.currency.is_native()
    }

    /// One whole token in minor units.
    pub fn one(&self) -> BigUint {
        num_traits::pow(BigUint::from(10u8), self.decimals as usize)
    }
}

impl PartialEq for TokenRef {
    fn eq(&self, other: &Self) -> bool {
        self.currency == other.currency
    }
}

impl Hash for TokenRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.currency.hash(state);
    }
}
