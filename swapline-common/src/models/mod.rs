pub mod intent;
pub mod quote;
pub mod route;
pub mod token;

use std::{fmt::Display, str::FromStr};

use alloy_primitives::{address, Address};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// A token quantity in the token's minor unit, i.e. its on-chain fixed-point integer.
pub type Amount = BigUint;

/// Number of fractional digits a token uses for its fixed-point representation.
pub type Decimals = u8;

/// The address conventionally used by wallets and aggregators to denote the native currency.
pub const NATIVE_SENTINEL: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// A fungible asset as seen by the caller: either the chain's native currency or an ERC-20
/// contract.
///
/// The native variant is never a valid AMM path element. It has to be translated into the
/// chain's wrapped-native token before building a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Native,
    Token(Address),
}

impl Currency {
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    /// The ERC-20 address, if this is not the native currency.
    pub fn address(&self) -> Option<Address> {
        match self {
            Self::Native => None,
            Self::Token(address) => Some(*address),
        }
    }

    /// The address to use on-chain, substituting `wrapped_native` for the native currency.
    pub fn resolve(&self, wrapped_native: Address) -> Address {
        self.address()
            .unwrap_or(wrapped_native)
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Token(address) => write!(f, "{address}"),
        }
    }
}

impl From<Address> for Currency {
    fn from(address: Address) -> Self {
        if address == NATIVE_SENTINEL {
            Self::Native
        } else {
            Self::Token(address)
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("native") || s.eq_ignore_ascii_case("eth") {
            return Ok(Self::Native);
        }
        Address::from_str(s)
            .map(Currency::from)
            .map_err(|e| format!("Invalid token address {s}: {e}"))
    }
}
