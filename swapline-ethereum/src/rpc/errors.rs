use swapline_common::errors::ChainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RPCError {
    /// The configured node url failed to parse.
    #[error("Failed to parse URL: {0}. Error: {1}")]
    UrlParsing(String, String),

    /// Errors forwarded from the HTTP protocol.
    #[error("Unexpected HTTP client error: {0}")]
    HttpClient(String, #[source] reqwest::Error),

    #[error("Rate limited by node")]
    RateLimited,

    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),

    /// The node answered with a JSON-RPC error object, e.g. because the call reverted.
    #[error("JSON-RPC error {code}: {message}")]
    ErrorResponse { code: i64, message: String, reason: Option<String> },

    /// The response from the node could not be parsed correctly.
    #[error("Failed to parse response: {0}")]
    ParseResponse(String),

    /// The call succeeded but its return data does not match the expected ABI.
    #[error("Failed to decode return data: {0}")]
    Decode(String),
}

impl RPCError {
    /// Whether the request may succeed when sent again. JSON-RPC error responses are final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpClient(_, err) => err.is_connect() || err.is_timeout() || err.is_request(),
            Self::RateLimited | Self::ServerUnreachable(_) => true,
            _ => false,
        }
    }
}

impl From<RPCError> for ChainError {
    fn from(err: RPCError) -> Self {
        match err {
            RPCError::ErrorResponse { reason: Some(reason), .. } => ChainError::Revert(reason),
            RPCError::ErrorResponse { message, .. } => ChainError::Revert(message),
            RPCError::ParseResponse(msg) | RPCError::Decode(msg) => ChainError::Decode(msg),
            err => ChainError::Request(err.to_string()),
        }
    }
}
