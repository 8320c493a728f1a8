//! Executes user-confirmed swaps and liquidity deposits.
//!
//! Every run validates its input before touching the chain, then performs any approval the main
//! transaction depends on and waits for it to be included before submitting the main
//! transaction. Submission failures are propagated as-is and never retried.

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use alloy_primitives::Address;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    constant_product, display,
    errors::{SwapError, SwapResult},
    models::{
        intent::{
            AddLiquidityIntent, ApproveIntent, ExecutionReport, InclusionReceipt, LiquiditySide,
            SwapIntent, TransactionIntent, TxHandle,
        },
        quote::Quote,
        route::Route,
        token::TokenRef,
        Amount,
    },
    routing::PathResolver,
    slippage::SlippagePolicy,
    traits::{ChainQuery, TransactionSubmitter, WalletAccount},
    units::to_minor_units,
};

/// Current unix time in seconds.
pub fn system_unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// The router contract. It is the spender of every approval.
    pub router: Address,
    pub wrapped_native: Address,
    #[serde(default)]
    pub policy: SlippagePolicy,
}

/// A swap the user confirmed, as captured from the form.
#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub input: Option<TokenRef>,
    pub output: Option<TokenRef>,
    /// Input amount as typed, in whole token units.
    pub amount: String,
    /// The quote shown to the user when they confirmed.
    pub quote: Option<Quote>,
}

/// A deposit into a pair that does not exist yet.
#[derive(Debug, Clone)]
pub struct AddLiquidityRequest {
    pub token_a: Option<TokenRef>,
    pub token_b: Option<TokenRef>,
    pub amount_a: String,
    pub amount_b: String,
}

pub struct TransactionSequencer {
    query: Arc<dyn ChainQuery>,
    submitter: Arc<dyn TransactionSubmitter>,
    wallet: Arc<dyn WalletAccount>,
    config: SequencerConfig,
    resolver: PathResolver,
    clock: fn() -> u64,
}

impl TransactionSequencer {
    pub fn new(
        query: Arc<dyn ChainQuery>,
        submitter: Arc<dyn TransactionSubmitter>,
        wallet: Arc<dyn WalletAccount>,
        config: SequencerConfig,
    ) -> Self {
        let resolver = PathResolver::new(config.wrapped_native);
        Self { query, submitter, wallet, config, resolver, clock: system_unix_time }
    }

    /// Replaces the clock used to compute deadlines.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Executes a confirmed swap.
    ///
    /// Preconditions are checked in order: wallet connected, both tokens selected and distinct,
    /// a positive amount, and an executable quote for exactly that amount. Nothing is read from
    /// or written to the chain before all of them hold.
    ///
    /// Wrapping and unwrapping is a single 1:1 call. Otherwise the input token is approved for
    /// the router if needed, and the swap is submitted with a minimum output derived from the
    /// quote and a deadline computed now.
    #[instrument(skip_all, fields(amount = %request.amount))]
    pub async fn execute_swap(&self, request: SwapRequest) -> SwapResult<ExecutionReport> {
        let owner = self.connected_account()?;
        let (input, output) = selected_pair(request.input.as_ref(), request.output.as_ref())?;
        let amount_in = parse_positive(&request.amount, input.decimals)?;
        let quote = request
            .quote
            .filter(|quote| quote.is_executable() && quote.input_amount == amount_in)
            .ok_or(SwapError::NoQuoteAvailable)?;

        let route = self
            .resolver
            .plan(input.currency, output.currency)?;
        if quote.route.as_ref() != Some(&route) {
            debug!(?route, quoted = ?quote.route, "Quote was computed for a different route");
            return Err(SwapError::NoQuoteAvailable);
        }

        let (path, native_in, native_out) = match route {
            Route::Wrap => {
                let intent = TransactionIntent::WrapNative {
                    wrapped_native: self.config.wrapped_native,
                    amount: amount_in,
                };
                return self.finish(Vec::new(), intent).await;
            }
            Route::Unwrap => {
                let intent = TransactionIntent::UnwrapNative {
                    wrapped_native: self.config.wrapped_native,
                    amount: amount_in,
                };
                return self.finish(Vec::new(), intent).await;
            }
            Route::Swap { path, native_in, native_out } => (path, native_in, native_out),
        };

        let mut approvals = Vec::new();
        if !native_in {
            approvals.extend(
                self.ensure_allowance(path.first(), &input.symbol, owner, &amount_in)
                    .await?,
            );
        }

        let min_amount_out = self
            .config
            .policy
            .min_output(&quote.output_amount);
        debug!(
            expected = display::amount(&quote.output_amount, output.decimals, &output.symbol),
            minimum = display::amount(&min_amount_out.bounded_amount, output.decimals, &output.symbol),
            "Applying slippage bound"
        );
        let intent = TransactionIntent::Swap(SwapIntent {
            path,
            amount_in,
            min_amount_out,
            native_in,
            native_out,
            recipient: owner,
            deadline: self.deadline()?,
        });
        self.finish(approvals, intent).await
    }

    /// Deposits liquidity into a new pair.
    ///
    /// Fails with `InsufficientReserves` if the amounts would not mint more than the locked
    /// minimum liquidity, with `PairAlreadyExists` if the pair is deployed, and with
    /// `InsufficientBalance` if either side exceeds the account's balance, before any approval is
    /// submitted. ERC-20 sides are approved one after the other.
    #[instrument(skip_all, fields(amount_a = %request.amount_a, amount_b = %request.amount_b))]
    pub async fn execute_add_liquidity(
        &self,
        request: AddLiquidityRequest,
    ) -> SwapResult<ExecutionReport> {
        let owner = self.connected_account()?;
        let (token_a, token_b) = selected_pair(request.token_a.as_ref(), request.token_b.as_ref())?;
        let wrapped_native = self.config.wrapped_native;
        let (address_a, address_b) =
            (token_a.currency.resolve(wrapped_native), token_b.currency.resolve(wrapped_native));
        if address_a == address_b {
            return Err(SwapError::TokenSelectionInvalid(format!(
                "{} and {} are the same pool side",
                token_a.symbol, token_b.symbol
            )));
        }
        let amount_a = parse_positive(&request.amount_a, token_a.decimals)?;
        let amount_b = parse_positive(&request.amount_b, token_b.decimals)?;
        let shares = constant_product::initial_liquidity(&amount_a, &amount_b)?;
        debug!(%shares, "First deposit mints enough shares");

        if let Some(pair) = self
            .query
            .get_pair_address(address_a, address_b)
            .await?
        {
            return Err(SwapError::PairAlreadyExists { token_a: address_a, token_b: address_b, pair });
        }

        for (token, amount) in [(token_a, &amount_a), (token_b, &amount_b)] {
            self.ensure_balance(token, owner, amount)
                .await?;
        }

        let mut approvals = Vec::new();
        for (token, amount) in [(token_a, &amount_a), (token_b, &amount_b)] {
            if let Some(address) = token.currency.address() {
                approvals.extend(
                    self.ensure_allowance(address, &token.symbol, owner, amount)
                        .await?,
                );
            }
        }

        let policy = &self.config.policy;
        let intent = TransactionIntent::AddLiquidity(AddLiquidityIntent {
            side_a: LiquiditySide {
                currency: token_a.currency,
                min: policy.min_output(&amount_a),
                desired: amount_a,
            },
            side_b: LiquiditySide {
                currency: token_b.currency,
                min: policy.min_output(&amount_b),
                desired: amount_b,
            },
            recipient: owner,
            deadline: self.deadline()?,
        });
        self.finish(approvals, intent).await
    }

    fn connected_account(&self) -> SwapResult<Address> {
        self.wallet
            .account()
            .ok_or(SwapError::WalletNotConnected)
    }

    fn deadline(&self) -> SwapResult<u64> {
        self.config
            .policy
            .deadline((self.clock)())
    }

    async fn ensure_balance(&self, token: &TokenRef, owner: Address, required: &Amount) -> SwapResult<()> {
        let available = match token.currency.address() {
            Some(address) => {
                self.query
                    .balance_of(address, owner)
                    .await?
            }
            None => {
                self.query
                    .native_balance(owner)
                    .await?
            }
        };
        debug!(
            token = %token.symbol,
            available = display::amount(&available, token.decimals, &token.symbol),
            "Read balance"
        );
        if &available < required {
            return Err(SwapError::InsufficientBalance {
                symbol: token.symbol.clone(),
                required: required.clone(),
                available,
            });
        }
        Ok(())
    }

    /// Approves `required` of `token` for the router unless the current allowance covers it.
    ///
    /// Returns the approval transaction, if one was needed. The approval is awaited and the
    /// allowance read again before returning.
    async fn ensure_allowance(
        &self,
        token: Address,
        symbol: &str,
        owner: Address,
        required: &Amount,
    ) -> SwapResult<Option<TxHandle>> {
        let spender = self.config.router;
        let approved = self
            .query
            .allowance(token, owner, spender)
            .await?;
        debug!(%token, %approved, %required, "Read allowance");
        if &approved >= required {
            return Ok(None);
        }

        let intent = TransactionIntent::Approve(ApproveIntent { token, spender, amount: required.clone() });
        let (tx, _) = self.submit_and_wait(&intent).await?;

        let approved = self
            .query
            .allowance(token, owner, spender)
            .await?;
        if &approved < required {
            return Err(SwapError::InsufficientAllowance {
                symbol: symbol.to_string(),
                required: required.clone(),
                approved,
            });
        }
        Ok(Some(tx))
    }

    async fn submit_and_wait(
        &self,
        intent: &TransactionIntent,
    ) -> SwapResult<(TxHandle, InclusionReceipt)> {
        info!(kind = %intent.kind(), "Submitting transaction");
        let tx = self.submitter.submit(intent).await?;
        info!(kind = %intent.kind(), %tx, "Waiting for inclusion");
        let receipt = self
            .submitter
            .await_inclusion(tx)
            .await?;
        info!(kind = %intent.kind(), %tx, block = receipt.block_number, "Transaction included");
        Ok((tx, receipt))
    }

    async fn finish(
        &self,
        approvals: Vec<TxHandle>,
        intent: TransactionIntent,
    ) -> SwapResult<ExecutionReport> {
        let (transaction, receipt) = self.submit_and_wait(&intent).await?;
        Ok(ExecutionReport { approvals, intent, transaction, receipt })
    }
}

fn selected_pair<'a>(
    first: Option<&'a TokenRef>,
    second: Option<&'a TokenRef>,
) -> SwapResult<(&'a TokenRef, &'a TokenRef)> {
    let (Some(first), Some(second)) = (first, second) else {
        return Err(SwapError::TokenSelectionInvalid("select both tokens".to_string()));
    };
    if first == second {
        return Err(SwapError::TokenSelectionInvalid(format!("{} selected twice", first.symbol)));
    }
    Ok((first, second))
}

fn parse_positive(amount: &str, decimals: u8) -> SwapResult<Amount> {
    let parsed = to_minor_units(amount, decimals)?;
    if parsed.is_zero() {
        return Err(SwapError::InvalidAmountFormat(format!("{amount:?}: amount must be positive")));
    }
    Ok(parsed)
}
