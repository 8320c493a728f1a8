//! Collaborators the core calls into.
//!
//! The core defines no wire format of its own. ABI encoding, JSON-RPC transport and signing are
//! all delegated to implementations of these traits, which are constructed from configuration at
//! startup and injected into the components that need them.

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::{
    errors::{ChainError, SubmissionError},
    models::{
        intent::{InclusionReceipt, TransactionIntent, TxHandle},
        route::Path,
        token::TokenMetadata,
        Amount,
    },
};

/// Read-only access to chain state.
///
/// Implementations must be safe to call concurrently. Reads are never serialized by the core.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Reserves of a pair contract, in the pair's `token0` / `token1` order.
    async fn get_reserves(&self, pair: Address) -> Result<(Amount, Amount), ChainError>;

    /// Address of the pair contract for two tokens, `None` if the factory has no such pair.
    async fn get_pair_address(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, ChainError>;

    /// Amounts at every hop boundary when trading `amount_in` along `path`. The returned vector
    /// has the same length as the path; its first element is `amount_in`.
    async fn amounts_out(&self, amount_in: &Amount, path: &Path) -> Result<Vec<Amount>, ChainError>;

    async fn balance_of(&self, token: Address, account: Address) -> Result<Amount, ChainError>;

    /// Balance of the chain's native currency.
    async fn native_balance(&self, account: Address) -> Result<Amount, ChainError>;

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<Amount, ChainError>;

    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata, ChainError>;
}

/// Submits writes on behalf of the connected account.
///
/// Implementations are expected to serialize submissions per account. The core only guarantees
/// that it awaits a submission's inclusion before issuing one that depends on it.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit(&self, intent: &TransactionIntent) -> Result<TxHandle, SubmissionError>;

    /// Resolves once the transaction is included. A reverted transaction resolves to
    /// `SubmissionError::Reverted` carrying the revert reason when available.
    async fn await_inclusion(&self, tx: TxHandle) -> Result<InclusionReceipt, SubmissionError>;
}

/// The wallet connection.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait WalletAccount: Send + Sync {
    /// The connected account, `None` while disconnected.
    fn account(&self) -> Option<Address>;

    fn is_connected(&self) -> bool {
        self.account().is_some()
    }
}

/// A wallet that is always connected to a fixed account. Useful for scripts and read-only tools.
#[derive(Debug, Clone, Copy)]
pub struct StaticAccount(pub Address);

impl WalletAccount for StaticAccount {
    fn account(&self) -> Option<Address> {
        Some(self.0)
    }
}
