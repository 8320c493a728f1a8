//! Expected-output quoting.
//!
//! Quotes are computed on demand from the router and never cached. [`QuoteEngine::quote`] is
//! fail-soft and always returns a [`Quote`], a zero-output one when no quote could be produced.
//! Callers that need the reason use [`QuoteEngine::try_quote`].

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use num_traits::Zero;
use tracing::{debug, instrument, warn};

use crate::{
    constant_product,
    display,
    errors::{ChainError, SwapError, SwapResult},
    models::{quote::Quote, route::Route, token::TokenRef, Amount},
    routing::PathResolver,
    traits::ChainQuery,
    units::to_minor_units,
};

pub struct QuoteEngine {
    query: Arc<dyn ChainQuery>,
    resolver: PathResolver,
}

impl QuoteEngine {
    pub fn new(query: Arc<dyn ChainQuery>, resolver: PathResolver) -> Self {
        Self { query, resolver }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Quotes `amount` of `input` into `output`. Never fails.
    ///
    /// Invalid amounts, unroutable pairs and chain errors all produce a zero-output quote
    /// without a route.
    pub async fn quote(&self, input: &TokenRef, output: &TokenRef, amount: &str) -> Quote {
        match self.try_quote(input, output, amount).await {
            Ok(quote) => quote,
            Err(err) => {
                if err.is_validation() || matches!(err, SwapError::NoLiquidityForPair(..)) {
                    debug!(input = %input.symbol, output = %output.symbol, amount, %err, "No quote");
                } else {
                    warn!(input = %input.symbol, output = %output.symbol, amount, %err, "Quote failed");
                }
                let input_amount = to_minor_units(amount, input.decimals).unwrap_or_default();
                Quote::zero(input_amount)
            }
        }
    }

    #[instrument(level = "debug", skip(self, input, output), fields(input = %input.symbol, output = %output.symbol))]
    pub async fn try_quote(
        &self,
        input: &TokenRef,
        output: &TokenRef,
        amount: &str,
    ) -> SwapResult<Quote> {
        let amount_in = to_minor_units(amount, input.decimals)?;
        if amount_in.is_zero() {
            return Err(SwapError::InvalidAmountFormat(format!("{amount:?}: amount must be positive")));
        }

        let route = self
            .resolver
            .resolve(self.query.as_ref(), input.currency, output.currency)
            .await?;

        let Some(path) = route.path() else {
            // Wrapping is always 1:1.
            return Ok(Quote::new(amount_in.clone(), amount_in, route));
        };

        let amounts = self
            .query
            .amounts_out(&amount_in, path)
            .await?;
        if amounts.len() != path.tokens().len() {
            return Err(ChainError::Decode(format!(
                "expected {} amounts for path {path}, got {}",
                path.tokens().len(),
                amounts.len()
            ))
            .into());
        }
        let amount_out = amounts
            .last()
            .cloned()
            .unwrap_or_default();

        debug!(
            amount_in = display::amount(&amount_in, input.decimals, &input.symbol),
            amount_out = display::amount(&amount_out, output.decimals, &output.symbol),
            "Quote computed"
        );
        Ok(Quote::new(amount_in, amount_out, route))
    }

    /// Quotes on behalf of the request identified by a fresh token from `tracker`.
    ///
    /// Returns `None` if a newer request was issued while this one was in flight.
    pub async fn quote_tracked(
        &self,
        tracker: &RequestTracker,
        input: &TokenRef,
        output: &TokenRef,
        amount: &str,
    ) -> Option<Quote> {
        let token = tracker.issue();
        let quote = self.quote(input, output, amount).await;
        tracker.accept(token, quote)
    }

    /// Price impact of trading `amount_in` along a direct route, in basis points.
    ///
    /// Wrapping has no price impact.
    pub async fn price_impact_bps(&self, route: &Route, amount_in: &Amount) -> SwapResult<u32> {
        let Some(path) = route.path() else {
            return Ok(0);
        };
        if path.hops() != 1 {
            return Err(SwapError::TokenSelectionInvalid(format!(
                "price impact is only available for direct routes, got {} hops",
                path.hops()
            )));
        }

        let (token_in, token_out) = (path.first(), path.last());
        let pair = self
            .query
            .get_pair_address(token_in, token_out)
            .await?
            .ok_or(SwapError::NoLiquidityForPair(token_in, token_out))?;
        let (reserve0, reserve1) = self.query.get_reserves(pair).await?;
        // The pair sorts its tokens by address.
        let (reserve_in, reserve_out) =
            if token_in < token_out { (reserve0, reserve1) } else { (reserve1, reserve0) };

        constant_product::price_impact_bps(amount_in, &reserve_in, &reserve_out)
    }
}

/// Identifies one quote request issued by a [`RequestTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// Tracks which quote request is the latest, so responses to superseded requests can be
/// discarded when they arrive out of order.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request, superseding all previously issued tokens.
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    /// Passes `quote` through only if `token` is still the latest request.
    pub fn accept(&self, token: RequestToken, quote: Quote) -> Option<Quote> {
        if self.is_current(token) {
            Some(quote)
        } else {
            debug!(request = token.0, "Dropping quote for superseded request");
            None
        }
    }
}
