//! JSON-RPC chain client.
//!
//! Reads go through `eth_call` against the factory, router, pair and token contracts. Transport
//! failures are retried with exponential backoff, JSON-RPC error responses never are.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, U256};
use alloy_sol_types::{Revert, SolCall, SolError};
use async_trait::async_trait;
use num_bigint::BigUint;
use reqwest::{header, Client, ClientBuilder, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use swapline_common::{
    errors::ChainError,
    models::{route::Path, token::TokenMetadata},
    traits::ChainQuery,
    Amount,
};
use tracing::{debug, instrument, trace};

use crate::abi::{
    decode_string_or_bytes32, AmountCodec, IUniswapV2Factory, IUniswapV2Pair,
    IUniswapV2Router02, IERC20,
};

pub mod config;
pub mod errors;

use config::RPCRetryConfig;
use errors::RPCError;

/// The Uniswap-V2 deployment the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub factory: Address,
    pub router: Address,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl From<JsonRpcError> for RPCError {
    fn from(err: JsonRpcError) -> Self {
        let reason = err
            .data
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|data| decode_hex(data).ok())
            .and_then(|data| Revert::abi_decode(&data).ok())
            .map(|revert| revert.reason);
        RPCError::ErrorResponse { code: err.code, message: err.message, reason }
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>, RPCError> {
    hex::decode(value.strip_prefix("0x").unwrap_or(value))
        .map_err(|e| RPCError::ParseResponse(format!("Invalid hex {value:?}: {e}")))
}

#[derive(Debug)]
pub struct HttpChainClient {
    http_client: Client,
    url: Url,
    contracts: ContractAddresses,
    retry: RPCRetryConfig,
    next_id: AtomicU64,
}

impl HttpChainClient {
    pub fn new(
        rpc_url: &str,
        contracts: ContractAddresses,
        retry: RPCRetryConfig,
    ) -> Result<Self, RPCError> {
        let url = rpc_url
            .parse::<Url>()
            .map_err(|e| RPCError::UrlParsing(rpc_url.to_string(), e.to_string()))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        let client = ClientBuilder::new()
            .default_headers(headers)
            .user_agent(format!("swapline/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RPCError::HttpClient(e.to_string(), e))?;

        Ok(Self { http_client: client, url, contracts, retry, next_id: AtomicU64::new(1) })
    }

    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    /// Converts an error status into an error. 429 and 502-504 are transient.
    async fn error_for_response(&self, response: Response) -> Result<Response, RPCError> {
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(RPCError::RateLimited),
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                Err(RPCError::ServerUnreachable(
                    response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Server Unreachable".to_string()),
                ))
            }
            _ => Ok(response),
        }
    }

    async fn send(&self, body: &Value) -> Result<JsonRpcResponse, RPCError> {
        let response = self
            .http_client
            .post(self.url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| RPCError::HttpClient(e.to_string(), e))?;
        let text = self
            .error_for_response(response)
            .await?
            .text()
            .await
            .map_err(|e| RPCError::HttpClient(e.to_string(), e))?;
        trace!(%text, "Received response");
        serde_json::from_str(&text).map_err(|e| RPCError::ParseResponse(format!("{e}: {text}")))
    }

    /// Sends a JSON-RPC request, retrying transient failures up to the configured count.
    #[instrument(level = "debug", skip(self, params))]
    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RPCError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let max_retries = self.retry.max_retries;
        let mut attempt = 0;
        let response = backoff::future::retry(self.retry.backoff(), || {
            attempt += 1;
            let exhausted = attempt > max_retries;
            let body = &body;
            async move {
                self.send(body)
                    .await
                    .map_err(|err| {
                        if err.is_transient() && !exhausted {
                            debug!(%err, attempt, "Retrying request");
                            backoff::Error::transient(err)
                        } else {
                            backoff::Error::permanent(err)
                        }
                    })
            }
        })
        .await?;

        if let Some(error) = response.error {
            return Err(error.into());
        }
        let result = response
            .result
            .ok_or_else(|| RPCError::ParseResponse("Response has neither result nor error".to_string()))?;
        serde_json::from_value(result).map_err(|e| RPCError::ParseResponse(e.to_string()))
    }

    async fn eth_call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, RPCError> {
        let params = json!([{ "to": to, "data": format!("0x{}", hex::encode(data)) }, "latest"]);
        let result: String = self.request("eth_call", params).await?;
        decode_hex(&result)
    }

    pub(crate) async fn call<C: SolCall>(&self, to: Address, call: &C) -> Result<C::Return, RPCError> {
        let output = self
            .eth_call(to, call.abi_encode())
            .await?;
        C::abi_decode_returns(&output)
            .map_err(|e| RPCError::Decode(format!("{} on {to}: {e}", C::SIGNATURE)))
    }
}

fn amount_from_u256(value: U256) -> Amount {
    BigUint::from_u256(value)
}

#[async_trait]
impl ChainQuery for HttpChainClient {
    async fn get_reserves(&self, pair: Address) -> Result<(Amount, Amount), ChainError> {
        let reserves = self
            .call(pair, &IUniswapV2Pair::getReservesCall {})
            .await?;
        Ok((
            BigUint::from_bytes_be(&reserves.reserve0.to_be_bytes_vec()),
            BigUint::from_bytes_be(&reserves.reserve1.to_be_bytes_vec()),
        ))
    }

    async fn get_pair_address(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, ChainError> {
        let pair = self
            .call(
                self.contracts.factory,
                &IUniswapV2Factory::getPairCall { tokenA: token_a, tokenB: token_b },
            )
            .await?;
        Ok((pair != Address::ZERO).then_some(pair))
    }

    async fn amounts_out(&self, amount_in: &Amount, path: &Path) -> Result<Vec<Amount>, ChainError> {
        let amount_in = amount_in
            .to_u256()
            .map_err(|e| ChainError::Decode(e.to_string()))?;
        let amounts = self
            .call(
                self.contracts.router,
                &IUniswapV2Router02::getAmountsOutCall {
                    amountIn: amount_in,
                    path: path.tokens().to_vec(),
                },
            )
            .await?;
        Ok(amounts
            .into_iter()
            .map(amount_from_u256)
            .collect())
    }

    async fn balance_of(&self, token: Address, account: Address) -> Result<Amount, ChainError> {
        let balance = self
            .call(token, &IERC20::balanceOfCall { account })
            .await?;
        Ok(amount_from_u256(balance))
    }

    async fn native_balance(&self, account: Address) -> Result<Amount, ChainError> {
        let balance: String = self
            .request("eth_getBalance", json!([account, "latest"]))
            .await?;
        let balance = balance
            .parse::<U256>()
            .map_err(|e| ChainError::Decode(format!("Invalid balance {balance:?}: {e}")))?;
        Ok(amount_from_u256(balance))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<Amount, ChainError> {
        let allowance = self
            .call(token, &IERC20::allowanceCall { owner, spender })
            .await?;
        Ok(amount_from_u256(allowance))
    }

    #[instrument(level = "debug", skip(self))]
    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata, ChainError> {
        let (decimals, symbol, name) = tokio::try_join!(
            self.call(token, &IERC20::decimalsCall {}),
            self.eth_call(token, IERC20::symbolCall {}.abi_encode()),
            self.eth_call(token, IERC20::nameCall {}.abi_encode()),
        )?;
        let symbol = decode_string_or_bytes32(&symbol)
            .ok_or_else(|| ChainError::Decode(format!("Invalid symbol() return data of {token}")))?;
        let name = decode_string_or_bytes32(&name)
            .ok_or_else(|| ChainError::Decode(format!("Invalid name() return data of {token}")))?;
        Ok(TokenMetadata { decimals, symbol, name })
    }
}
