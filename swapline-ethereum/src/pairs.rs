//! Lists the pairs created by the factory through `allPairsLength()` / `allPairs(i)`.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::Serialize;
use swapline_common::{
    aggregate::{IndexWindow, IndexedReader, IndexedSource, Record},
    errors::ChainError,
};

use crate::{abi::IUniswapV2Factory, rpc::HttpChainClient};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairListing {
    /// Position in the factory's creation order.
    pub index: u64,
    pub pair: Address,
}

impl Record for PairListing {
    type Key = Address;

    fn key(&self) -> Address {
        self.pair
    }

    fn ordinal(&self) -> u64 {
        self.index
    }
}

pub struct FactoryPairs {
    client: Arc<HttpChainClient>,
}

impl FactoryPairs {
    pub fn new(client: Arc<HttpChainClient>) -> Self {
        Self { client }
    }

    /// A source reading only the pairs inside `window`.
    pub fn into_source(self, name: impl Into<String>, window: IndexWindow) -> IndexedSource<Self> {
        IndexedSource::new(name, self).with_window(window)
    }
}

#[async_trait]
impl IndexedReader<PairListing> for FactoryPairs {
    async fn count(&self) -> Result<u64, ChainError> {
        let length = self
            .client
            .call(self.client.contracts().factory, &IUniswapV2Factory::allPairsLengthCall {})
            .await?;
        Ok(length.saturating_to())
    }

    async fn item_at(&self, index: u64) -> Result<PairListing, ChainError> {
        let pair = self
            .client
            .call(
                self.client.contracts().factory,
                &IUniswapV2Factory::allPairsCall { index: U256::from(index) },
            )
            .await?;
        Ok(PairListing { index, pair })
    }
}
