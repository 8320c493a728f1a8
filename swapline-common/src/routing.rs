//! Path resolution between two currencies.
//!
//! Only direct routes are supported: the native currency is bridged through the wrapped-native
//! token, but no search through arbitrary intermediate tokens is attempted. A missing pool
//! yields `NoLiquidityForPair`.

use alloy_primitives::Address;
use tracing::{debug, instrument};

use crate::{
    errors::{SwapError, SwapResult},
    models::{
        route::{Path, Route},
        Currency,
    },
    traits::ChainQuery,
};

/// Whether the factory has a pair for the two tokens.
pub async fn pool_exists(
    query: &dyn ChainQuery,
    token_a: Address,
    token_b: Address,
) -> SwapResult<bool> {
    Ok(query
        .get_pair_address(token_a, token_b)
        .await?
        .is_some())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathResolver {
    wrapped_native: Address,
}

impl PathResolver {
    pub fn new(wrapped_native: Address) -> Self {
        Self { wrapped_native }
    }

    pub fn wrapped_native(&self) -> Address {
        self.wrapped_native
    }

    /// Resolves the route without checking on-chain liquidity.
    ///
    /// Cases are evaluated in order:
    /// 1. identical currencies fail with `IdenticalTokens`,
    /// 2. native into wrapped-native is a 1:1 wrap,
    /// 3. wrapped-native into native is a 1:1 unwrap,
    /// 4. anything else is a direct swap with native endpoints replaced by wrapped-native.
    pub fn plan(&self, input: Currency, output: Currency) -> SwapResult<Route> {
        if input == output {
            return Err(SwapError::IdenticalTokens(input.to_string()));
        }

        let wrapped = Currency::Token(self.wrapped_native);
        match (input, output) {
            (Currency::Native, out) if out == wrapped => return Ok(Route::Wrap),
            (inp, Currency::Native) if inp == wrapped => return Ok(Route::Unwrap),
            _ => {}
        }

        let path = Path::new(vec![
            input.resolve(self.wrapped_native),
            output.resolve(self.wrapped_native),
        ])?;
        Ok(Route::Swap { path, native_in: input.is_native(), native_out: output.is_native() })
    }

    /// Resolves the route and confirms every pool along it exists.
    #[instrument(level = "debug", skip(self, query))]
    pub async fn resolve(
        &self,
        query: &dyn ChainQuery,
        input: Currency,
        output: Currency,
    ) -> SwapResult<Route> {
        let route = self.plan(input, output)?;
        if let Some(path) = route.path() {
            for (token_a, token_b) in path.pairs() {
                if !pool_exists(query, token_a, token_b).await? {
                    debug!(%token_a, %token_b, "No pool for pair");
                    return Err(SwapError::NoLiquidityForPair(token_a, token_b));
                }
            }
        }
        Ok(route)
    }
}
