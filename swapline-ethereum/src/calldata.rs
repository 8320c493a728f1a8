//! Translates transaction intents into unsigned EVM transactions.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};
use swapline_common::models::intent::{
    AddLiquidityIntent, ApproveIntent, SwapIntent, TransactionIntent,
};
use thiserror::Error;

use crate::abi::{AmountCodec, AmountOverflow, IUniswapV2Router02, IWETH9, IERC20};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error(transparent)]
    Overflow(#[from] AmountOverflow),
    #[error("Unsupported intent: {0}")]
    Unsupported(String),
}

/// The fields of a transaction the signer still has to fill in nonce, gas and chain id for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedTransaction {
    pub to: Address,
    pub data: Bytes,
    /// Native currency sent along with the call.
    pub value: U256,
}

impl EncodedTransaction {
    fn call(to: Address, call: impl SolCall) -> Self {
        Self { to, data: call.abi_encode().into(), value: U256::ZERO }
    }

    fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// Encodes `intent` as a call to the token, the wrapped-native contract or `router`.
pub fn encode_intent(
    intent: &TransactionIntent,
    router: Address,
) -> Result<EncodedTransaction, EncodingError> {
    match intent {
        TransactionIntent::Approve(approve) => encode_approve(approve),
        TransactionIntent::Swap(swap) => encode_swap(swap, router),
        TransactionIntent::AddLiquidity(deposit) => encode_add_liquidity(deposit, router),
        TransactionIntent::WrapNative { wrapped_native, amount } => {
            Ok(EncodedTransaction::call(*wrapped_native, IWETH9::depositCall {})
                .with_value(amount.to_u256()?))
        }
        TransactionIntent::UnwrapNative { wrapped_native, amount } => Ok(EncodedTransaction::call(
            *wrapped_native,
            IWETH9::withdrawCall { wad: amount.to_u256()? },
        )),
    }
}

fn encode_approve(approve: &ApproveIntent) -> Result<EncodedTransaction, EncodingError> {
    Ok(EncodedTransaction::call(
        approve.token,
        IERC20::approveCall { spender: approve.spender, amount: approve.amount.to_u256()? },
    ))
}

fn encode_swap(swap: &SwapIntent, router: Address) -> Result<EncodedTransaction, EncodingError> {
    let path = swap.path.tokens().to_vec();
    let amount_in = swap.amount_in.to_u256()?;
    let amount_out_min = swap
        .min_amount_out
        .bounded_amount
        .to_u256()?;
    let deadline = U256::from(swap.deadline);
    let to = swap.recipient;

    let transaction = match (swap.native_in, swap.native_out) {
        (false, false) => EncodedTransaction::call(
            router,
            IUniswapV2Router02::swapExactTokensForTokensCall {
                amountIn: amount_in,
                amountOutMin: amount_out_min,
                path,
                to,
                deadline,
            },
        ),
        (true, false) => EncodedTransaction::call(
            router,
            IUniswapV2Router02::swapExactETHForTokensCall {
                amountOutMin: amount_out_min,
                path,
                to,
                deadline,
            },
        )
        .with_value(amount_in),
        (false, true) => EncodedTransaction::call(
            router,
            IUniswapV2Router02::swapExactTokensForETHCall {
                amountIn: amount_in,
                amountOutMin: amount_out_min,
                path,
                to,
                deadline,
            },
        ),
        (true, true) => {
            return Err(EncodingError::Unsupported(
                "a swap cannot both pay and receive the native currency".to_string(),
            ))
        }
    };
    Ok(transaction)
}

fn encode_add_liquidity(
    deposit: &AddLiquidityIntent,
    router: Address,
) -> Result<EncodedTransaction, EncodingError> {
    let to = deposit.recipient;
    let deadline = U256::from(deposit.deadline);

    if let (Some(native), Some(token)) = (deposit.native_side(), deposit.token_side()) {
        let token_address = token
            .currency
            .address()
            .ok_or_else(|| EncodingError::Unsupported("token side is native".to_string()))?;
        let call = IUniswapV2Router02::addLiquidityETHCall {
            token: token_address,
            amountTokenDesired: token.desired.to_u256()?,
            amountTokenMin: token.min.bounded_amount.to_u256()?,
            amountETHMin: native.min.bounded_amount.to_u256()?,
            to,
            deadline,
        };
        return Ok(EncodedTransaction::call(router, call).with_value(native.desired.to_u256()?));
    }

    let (Some(token_a), Some(token_b)) =
        (deposit.side_a.currency.address(), deposit.side_b.currency.address())
    else {
        return Err(EncodingError::Unsupported("both sides are native".to_string()));
    };
    let call = IUniswapV2Router02::addLiquidityCall {
        tokenA: token_a,
        tokenB: token_b,
        amountADesired: deposit.side_a.desired.to_u256()?,
        amountBDesired: deposit.side_b.desired.to_u256()?,
        amountAMin: deposit.side_a.min.bounded_amount.to_u256()?,
        amountBMin: deposit.side_b.min.bounded_amount.to_u256()?,
        to,
        deadline,
    };
    Ok(EncodedTransaction::call(router, call))
}
