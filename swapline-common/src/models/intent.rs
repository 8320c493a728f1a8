use std::fmt::Display;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::{route::Path, Amount, Currency};
use crate::slippage::SlippageBound;

/// Discriminant of a [`TransactionIntent`], mostly useful for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IntentKind {
    Approve,
    Swap,
    AddLiquidity,
    WrapNative,
    UnwrapNative,
}

/// Allow `spender` to move `amount` of `token` on behalf of the connected account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveIntent {
    pub token: Address,
    pub spender: Address,
    pub amount: Amount,
}

/// Exact-input swap along `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapIntent {
    pub path: Path,
    pub amount_in: Amount,
    /// Protection bound derived from the quoted output. The swap reverts below it.
    pub min_amount_out: SlippageBound,
    /// The caller pays with the native currency. `path` starts with the wrapped-native token.
    pub native_in: bool,
    /// The caller receives the native currency. `path` ends with the wrapped-native token.
    pub native_out: bool,
    pub recipient: Address,
    /// Unix timestamp after which the router rejects the swap.
    pub deadline: u64,
}

/// One side of a liquidity deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquiditySide {
    pub currency: Currency,
    pub desired: Amount,
    pub min: SlippageBound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidityIntent {
    pub side_a: LiquiditySide,
    pub side_b: LiquiditySide,
    pub recipient: Address,
    pub deadline: u64,
}

impl AddLiquidityIntent {
    /// The side paid in the native currency, if any. At most one side can be native.
    pub fn native_side(&self) -> Option<&LiquiditySide> {
        [&self.side_a, &self.side_b]
            .into_iter()
            .find(|side| side.currency.is_native())
    }

    /// The side paid with an ERC-20 token when the other one is native.
    pub fn token_side(&self) -> Option<&LiquiditySide> {
        [&self.side_a, &self.side_b]
            .into_iter()
            .find(|side| !side.currency.is_native())
    }
}

/// A single on-chain write the caller's signer is asked to perform.
///
/// Intents are created by the sequencer, consumed by the submission collaborator and never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionIntent {
    Approve(ApproveIntent),
    Swap(SwapIntent),
    AddLiquidity(AddLiquidityIntent),
    WrapNative { wrapped_native: Address, amount: Amount },
    UnwrapNative { wrapped_native: Address, amount: Amount },
}

impl TransactionIntent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Self::Approve(_) => IntentKind::Approve,
            Self::Swap(_) => IntentKind::Swap,
            Self::AddLiquidity(_) => IntentKind::AddLiquidity,
            Self::WrapNative { .. } => IntentKind::WrapNative,
            Self::UnwrapNative { .. } => IntentKind::UnwrapNative,
        }
    }
}

/// Identifies a submitted transaction, i.e. its hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle(pub B256);

impl Display for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Confirmation that a transaction was included and did not revert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionReceipt {
    pub tx: TxHandle,
    pub block_number: u64,
}

/// Outcome of a successful sequencer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Approvals submitted and confirmed before the main transaction, in submission order.
    pub approvals: Vec<TxHandle>,
    pub intent: TransactionIntent,
    pub transaction: TxHandle,
    pub receipt: InclusionReceipt,
}
