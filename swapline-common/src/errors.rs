use alloy_primitives::Address;
use thiserror::Error;

use crate::models::Amount;

/// Failures reported by the read-only chain query collaborator.
///
/// Variants:
/// - `Request`: the request never produced a response, e.g. a network problem. Retrying later may
///   succeed.
/// - `Revert`: the node answered but the call reverted or returned an RPC error.
/// - `Decode`: the response could not be decoded into the expected type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Chain request failed: {0}")]
    Request(String),
    #[error("Call reverted: {0}")]
    Revert(String),
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Failures reported by the transaction submission collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Transaction rejected by user")]
    RejectedByUser,
    #[error("Transaction reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Reverted { reason: Option<String> },
    #[error("Timed out waiting for transaction inclusion")]
    TimedOutWaitingForInclusion,
    #[error("Submission failed: {0}")]
    Other(String),
}

/// Represents the user-facing errors of the swap core.
///
/// Every variant names the precondition or on-chain condition that was violated, so callers can
/// render targeted guidance instead of a generic failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapError {
    #[error("Invalid amount: {0}")]
    InvalidAmountFormat(String),
    #[error("Slippage tolerance must be within 0..=10000 bps, got {0}")]
    InvalidToleranceRange(u32),
    #[error("Deadline buffer must be a positive number of seconds, got {0}")]
    InvalidDeadlineBuffer(u64),
    #[error("Invalid token selection: {0}")]
    TokenSelectionInvalid(String),
    #[error("Input and output tokens are identical: {0}")]
    IdenticalTokens(String),
    #[error("No liquidity for pair {0} / {1}")]
    NoLiquidityForPair(Address, Address),
    #[error("Pair {token_a} / {token_b} already exists at {pair}")]
    PairAlreadyExists { token_a: Address, token_b: Address, pair: Address },
    #[error("Insufficient balance of {symbol}: required {required}, available {available}")]
    InsufficientBalance { symbol: String, required: Amount, available: Amount },
    #[error("Insufficient allowance of {symbol}: required {required}, approved {approved}")]
    InsufficientAllowance { symbol: String, required: Amount, approved: Amount },
    #[error("Insufficient reserves: {0}")]
    InsufficientReserves(String),
    #[error("Wallet not connected")]
    WalletNotConnected,
    #[error("No quote available")]
    NoQuoteAvailable,
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

impl SwapError {
    /// Errors detected synchronously from the caller's input, before any external call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmountFormat(_) |
                Self::InvalidToleranceRange(_) |
                Self::InvalidDeadlineBuffer(_) |
                Self::TokenSelectionInvalid(_) |
                Self::IdenticalTokens(_)
        )
    }

    /// Errors where resubmitting may succeed once the user decides to, e.g. after adjusting
    /// slippage. The core itself never retries.
    pub fn is_retryable_by_user(&self) -> bool {
        matches!(
            self,
            Self::Chain(ChainError::Request(_)) |
                Self::Submission(SubmissionError::RejectedByUser) |
                Self::Submission(SubmissionError::Reverted { .. }) |
                Self::Submission(SubmissionError::TimedOutWaitingForInclusion)
        )
    }
}

pub type SwapResult<T> = std::result::Result<T, SwapError>;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::amount(SwapError::InvalidAmountFormat("abc".into()), true)]
    #[case::tolerance(SwapError::InvalidToleranceRange(10_001), true)]
    #[case::identical(SwapError::IdenticalTokens("WETH".into()), true)]
    #[case::wallet(SwapError::WalletNotConnected, false)]
    #[case::no_quote(SwapError::NoQuoteAvailable, false)]
    fn test_is_validation(#[case] error: SwapError, #[case] expected: bool) {
        assert_eq!(error.is_validation(), expected);
    }

    #[test]
    fn test_revert_reason_is_kept_in_message() {
        let err: SwapError =
            SubmissionError::Reverted { reason: Some("UniswapV2Router: EXPIRED".into()) }.into();

        assert_eq!(err.to_string(), "Transaction reverted: UniswapV2Router: EXPIRED");
        assert!(err.is_retryable_by_user());
    }

    #[test]
    fn test_revert_without_reason() {
        let err = SubmissionError::Reverted { reason: None };

        assert_eq!(err.to_string(), "Transaction reverted: no reason given");
    }
}
