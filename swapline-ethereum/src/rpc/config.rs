use std::time::Duration;

use backoff::{exponential::ExponentialBackoffBuilder, ExponentialBackoff};
use serde::{Deserialize, Serialize};

/// Configuration for RPC request retry behavior
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RPCRetryConfig {
    /// Maximum number of retries after the first attempt (default: 3)
    pub max_retries: usize,
    /// Initial backoff delay in milliseconds (default: 100ms)
    pub initial_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds (default: 5000ms)
    pub max_backoff_ms: u64,
}

impl RPCRetryConfig {
    pub fn new(max_retries: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self { max_retries, initial_backoff_ms, max_backoff_ms }
    }

    /// Retries immediately and only once. Meant for tests against a local server.
    pub fn fast() -> Self {
        Self { max_retries: 1, initial_backoff_ms: 1, max_backoff_ms: 5 }
    }

    pub(crate) fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.initial_backoff_ms))
            // increase backoff time by 75% each failure
            .with_multiplier(1.75)
            .with_max_interval(Duration::from_millis(self.max_backoff_ms))
            // the retry count is enforced by the caller
            .with_max_elapsed_time(None)
            .build()
    }
}

impl Default for RPCRetryConfig {
    fn default() -> Self {
        Self { max_retries: 3, initial_backoff_ms: 100, max_backoff_ms: 5000 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_from_config() {
        let backoff = RPCRetryConfig::new(5, 200, 1000).backoff();

        assert_eq!(backoff.initial_interval, Duration::from_millis(200));
        assert_eq!(backoff.max_interval, Duration::from_millis(1000));
        assert_eq!(backoff.max_elapsed_time, None);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: RPCRetryConfig = serde_json::from_str(r#"{"max_retries": 7}"#).unwrap();

        assert_eq!(config, RPCRetryConfig { max_retries: 7, ..RPCRetryConfig::default() });
    }
}
