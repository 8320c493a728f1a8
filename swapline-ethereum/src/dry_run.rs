//! Runs the transaction sequencer against live chain reads without broadcasting anything.
//!
//! [`DryRun`] stands in for both the chain query and the submitter. Submitted intents are
//! recorded in order and treated as included at once, and allowance reads reflect the approvals
//! recorded so far, so the sequencer takes the same decisions it would take against a wallet.

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use swapline_common::{
    errors::{ChainError, SubmissionError},
    models::{
        intent::{InclusionReceipt, TransactionIntent, TxHandle},
        route::Path,
        token::TokenMetadata,
    },
    traits::{ChainQuery, TransactionSubmitter},
    Amount,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::calldata::{encode_intent, EncodedTransaction, EncodingError};

pub struct DryRun {
    query: Arc<dyn ChainQuery>,
    recorded: Mutex<Vec<TransactionIntent>>,
}

impl DryRun {
    pub fn new(query: Arc<dyn ChainQuery>) -> Self {
        Self { query, recorded: Mutex::new(Vec::new()) }
    }

    /// Intents submitted so far, in submission order.
    pub async fn intents(&self) -> Vec<TransactionIntent> {
        self.recorded.lock().await.clone()
    }

    /// The recorded intents as unsigned transactions.
    pub async fn transactions(&self, router: Address) -> Result<Vec<EncodedTransaction>, EncodingError> {
        self.recorded
            .lock()
            .await
            .iter()
            .map(|intent| encode_intent(intent, router))
            .collect()
    }

    async fn recorded_approval(&self, token: Address, spender: Address) -> Option<Amount> {
        self.recorded
            .lock()
            .await
            .iter()
            .rev()
            .find_map(|intent| match intent {
                TransactionIntent::Approve(approve)
                    if approve.token == token && approve.spender == spender =>
                {
                    Some(approve.amount.clone())
                }
                _ => None,
            })
    }
}

#[async_trait]
impl ChainQuery for DryRun {
    async fn get_reserves(&self, pair: Address) -> Result<(Amount, Amount), ChainError> {
        self.query.get_reserves(pair).await
    }

    async fn get_pair_address(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, ChainError> {
        self.query
            .get_pair_address(token_a, token_b)
            .await
    }

    async fn amounts_out(&self, amount_in: &Amount, path: &Path) -> Result<Vec<Amount>, ChainError> {
        self.query
            .amounts_out(amount_in, path)
            .await
    }

    async fn balance_of(&self, token: Address, account: Address) -> Result<Amount, ChainError> {
        self.query
            .balance_of(token, account)
            .await
    }

    async fn native_balance(&self, account: Address) -> Result<Amount, ChainError> {
        self.query
            .native_balance(account)
            .await
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<Amount, ChainError> {
        if let Some(amount) = self
            .recorded_approval(token, spender)
            .await
        {
            return Ok(amount);
        }
        self.query
            .allowance(token, owner, spender)
            .await
    }

    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata, ChainError> {
        self.query.token_metadata(token).await
    }
}

#[async_trait]
impl TransactionSubmitter for DryRun {
    async fn submit(&self, intent: &TransactionIntent) -> Result<TxHandle, SubmissionError> {
        let mut recorded = self.recorded.lock().await;
        recorded.push(intent.clone());
        let position = recorded.len() as u64;
        debug!(kind = %intent.kind(), position, "Recorded transaction");
        Ok(TxHandle(B256::left_padding_from(&position.to_be_bytes())))
    }

    async fn await_inclusion(&self, tx: TxHandle) -> Result<InclusionReceipt, SubmissionError> {
        Ok(InclusionReceipt { tx, block_number: 0 })
    }
}
