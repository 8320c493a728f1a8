use std::fmt::Display;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::errors::SwapError;

/// An ordered sequence of token addresses traded through, one pool per adjacent pair.
///
/// Invariants: at least two entries and no two adjacent entries are the same token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Address>);

impl Path {
    pub fn new(tokens: Vec<Address>) -> Result<Self, SwapError> {
        if tokens.len() < 2 {
            return Err(SwapError::TokenSelectionInvalid(format!(
                "a path needs at least two tokens, got {}",
                tokens.len()
            )));
        }
        if let Some(pair) = tokens
            .windows(2)
            .find(|pair| pair[0] == pair[1])
        {
            return Err(SwapError::IdenticalTokens(pair[0].to_string()));
        }
        Ok(Self(tokens))
    }

    pub fn tokens(&self) -> &[Address] {
        &self.0
    }

    pub fn first(&self) -> Address {
        self.0[0]
    }

    pub fn last(&self) -> Address {
        self.0[self.0.len() - 1]
    }

    /// Number of pools traded through.
    pub fn hops(&self) -> usize {
        self.0.len() - 1
    }

    /// Adjacent token pairs, one per pool.
    pub fn pairs(&self) -> impl Iterator<Item = (Address, Address)> + '_ {
        self.0
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tokens = self
            .0
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>();
        write!(f, "{}", tokens.join(" -> "))
    }
}

/// How an input currency gets converted into an output currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// Native currency into the wrapped-native token, exactly 1:1.
    Wrap,
    /// Wrapped-native token back into the native currency, exactly 1:1.
    Unwrap,
    /// A trade through AMM pools. `native_in` / `native_out` mark endpoints where the caller
    /// supplies or receives the native currency while the path holds the wrapped-native token.
    Swap { path: Path, native_in: bool, native_out: bool },
}

impl Route {
    pub fn is_wrap_or_unwrap(&self) -> bool {
        matches!(self, Self::Wrap | Self::Unwrap)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Swap { path, .. } => Some(path),
            _ => None,
        }
    }
}
