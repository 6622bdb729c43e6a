//! Ethereum RPC client.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use alloy::{
    network::Ethereum,
    primitives::{Bytes, B256},
    providers::{Provider, ProviderBuilder, RootProvider},
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::RpcTransport;
use crate::{
    config::{Config, DEFAULT_CALL_TIMEOUT, DEFAULT_LOG_TIMEOUT},
    error::{AppError, Result},
    types::{BlockTag, FilterPayload, RawLog, TransactionPayload},
};

/// Type alias for the HTTP provider.
pub type HttpProvider = RootProvider<Ethereum>;

/// Ethereum RPC client over HTTP.
///
/// Ordinary requests are bounded by `call_timeout`; filter log fetches, which
/// can return long histories, by the separate `log_timeout`. A timed-out
/// request is reported as [`AppError::Timeout`] and its eventual response is
/// discarded.
#[derive(Clone)]
pub struct EthereumClient {
    /// The underlying provider.
    provider: Arc<HttpProvider>,
    /// RPC URL for logging.
    rpc_url: String,
    call_timeout: Duration,
    log_timeout: Duration,
}

impl EthereumClient {
    /// Create a new Ethereum client with default timeouts.
    ///
    /// Note: This does NOT make any network calls. The connection is
    /// established lazily when the first operation is performed.
    pub fn new(rpc_url: &str) -> Result<Self> {
        Self::with_timeouts(rpc_url, DEFAULT_CALL_TIMEOUT, DEFAULT_LOG_TIMEOUT)
    }

    /// Create a client from application configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_timeouts(&config.rpc_url, config.call_timeout, config.log_timeout)
    }

    /// Create a client with explicit timeouts.
    pub fn with_timeouts(
        rpc_url: &str,
        call_timeout: Duration,
        log_timeout: Duration,
    ) -> Result<Self> {
        let url = rpc_url
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid RPC URL: {}", rpc_url)))?;

        #[allow(deprecated)]
        let provider = ProviderBuilder::new().connect_http(url).root().clone();

        tracing::info!(
            rpc_url = %rpc_url,
            call_timeout_secs = call_timeout.as_secs(),
            log_timeout_secs = log_timeout.as_secs(),
            "Ethereum client created (lazy initialization)"
        );

        Ok(Self {
            provider: Arc::new(provider),
            rpc_url: rpc_url.to_string(),
            call_timeout,
            log_timeout,
        })
    }

    /// Send one JSON-RPC request and deserialize its result.
    async fn request<R: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
        timeout: Duration,
    ) -> Result<R> {
        tracing::debug!(method, rpc_url = %self.rpc_url, params = %params, "RPC request");

        let pending = self.provider.raw_request::<Value, Value>(Cow::Borrowed(method), params);
        let response = match tokio::time::timeout(timeout, pending).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(method, timeout_secs = timeout.as_secs(), "RPC request timed out");
                return Err(AppError::Timeout(timeout));
            }
        };

        serde_json::from_value(response)
            .map_err(|e| AppError::Rpc(format!("Unexpected {} response: {}", method, e)))
    }
}

#[async_trait]
impl RpcTransport for EthereumClient {
    async fn call(&self, request: &TransactionPayload, block: BlockTag) -> Result<Option<Bytes>> {
        let params = Value::Array(vec![serde_json::to_value(request)?, Value::from(block.to_param())]);
        self.request("eth_call", params, self.call_timeout).await
    }

    async fn send_transaction(&self, payload: &TransactionPayload) -> Result<B256> {
        let params = Value::Array(vec![serde_json::to_value(payload)?]);
        self.request("eth_sendTransaction", params, self.call_timeout).await
    }

    async fn new_filter(&self, filter: &FilterPayload) -> Result<String> {
        let params = Value::Array(vec![serde_json::to_value(filter)?]);
        self.request("eth_newFilter", params, self.call_timeout).await
    }

    async fn get_filter_logs(&self, filter_id: &str) -> Result<Vec<RawLog>> {
        let params = Value::Array(vec![Value::from(filter_id)]);
        self.request("eth_getFilterLogs", params, self.log_timeout).await
    }

    async fn get_filter_changes(&self, filter_id: &str) -> Result<Vec<RawLog>> {
        let params = Value::Array(vec![Value::from(filter_id)]);
        self.request("eth_getFilterChanges", params, self.log_timeout).await
    }

    async fn uninstall_filter(&self, filter_id: &str) -> Result<bool> {
        let params = Value::Array(vec![Value::from(filter_id)]);
        self.request("eth_uninstallFilter", params, self.call_timeout).await
    }
}
