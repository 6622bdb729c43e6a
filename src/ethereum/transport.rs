//! JSON-RPC transport seam.

use alloy::primitives::{Bytes, B256};
use async_trait::async_trait;

use crate::{
    error::Result,
    types::{BlockTag, FilterPayload, RawLog, TransactionPayload},
};

/// The subset of the `eth_` namespace the contract session relies on.
///
/// Implementations own connection, timeout and retry policy; errors are
/// passed through to the caller unchanged.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// `eth_call`. `None` when the node returns `null`.
    async fn call(&self, request: &TransactionPayload, block: BlockTag) -> Result<Option<Bytes>>;

    /// `eth_sendTransaction`, returning the transaction hash.
    async fn send_transaction(&self, payload: &TransactionPayload) -> Result<B256>;

    /// `eth_newFilter`, returning the node-assigned filter id.
    async fn new_filter(&self, filter: &FilterPayload) -> Result<String>;

    /// `eth_getFilterLogs`.
    async fn get_filter_logs(&self, filter_id: &str) -> Result<Vec<RawLog>>;

    /// `eth_getFilterChanges`.
    async fn get_filter_changes(&self, filter_id: &str) -> Result<Vec<RawLog>>;

    /// `eth_uninstallFilter`. `false` when the node no longer knew the filter.
    async fn uninstall_filter(&self, filter_id: &str) -> Result<bool>;
}
