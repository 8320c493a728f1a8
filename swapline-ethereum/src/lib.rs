//! Uniswap-V2 adapter for `swapline-common`.
//!
//! Implements [`swapline_common::traits::ChainQuery`] over JSON-RPC and encodes
//! [`swapline_common::models::intent::TransactionIntent`]s as router, token and wrapped-native
//! contract calls.

pub mod abi;
pub mod calldata;
pub mod dry_run;
pub mod pairs;
pub mod rpc;

pub use rpc::{config::RPCRetryConfig, errors::RPCError, ContractAddresses, HttpChainClient};
