//! Configuration management module.
//!
//! Handles loading configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::error::AppError;

/// Default timeout for ordinary RPC calls.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for filter log fetches, which may return large histories.
pub const DEFAULT_LOG_TIMEOUT: Duration = Duration::from_secs(600);

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ethereum JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// Logging level (default: info).
    pub log_level: String,
    /// Timeout applied to `eth_call`, `eth_sendTransaction` and filter management.
    pub call_timeout: Duration,
    /// Timeout applied to `eth_getFilterLogs` / `eth_getFilterChanges`.
    pub log_timeout: Duration,
}

impl Config {
    /// Configuration for `rpc_url` with default timeouts and log level.
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            log_level: "info".to_string(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            log_timeout: DEFAULT_LOG_TIMEOUT,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `ETHEREUM_RPC_URL`: Ethereum JSON-RPC endpoint
    ///
    /// Optional environment variables:
    /// - `LOG_LEVEL`: Logging level (default: info)
    /// - `RPC_CALL_TIMEOUT_SECS`: Timeout for ordinary calls (default: 30)
    /// - `RPC_LOG_TIMEOUT_SECS`: Timeout for filter log fetches (default: 600)
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let rpc_url = env::var("ETHEREUM_RPC_URL").map_err(|_| {
            AppError::Config("ETHEREUM_RPC_URL environment variable not set".into())
        })?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let call_timeout = timeout_var("RPC_CALL_TIMEOUT_SECS", DEFAULT_CALL_TIMEOUT)?;
        let log_timeout = timeout_var("RPC_LOG_TIMEOUT_SECS", DEFAULT_LOG_TIMEOUT)?;

        Ok(Self { rpc_url, log_level, call_timeout, log_timeout })
    }
}

fn timeout_var(name: &str, default: Duration) -> Result<Duration, AppError> {
    match env::var(name) {
        Ok(raw) => parse_timeout_secs(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_timeout_secs(name: &str, raw: &str) -> Result<Duration, AppError> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a whole number of seconds", name)))?;
    if secs == 0 {
        return Err(AppError::Config(format!("{} must be greater than zero", name)));
    }
    Ok(Duration::from_secs(secs))
}
