//! Common utilities for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::{Address, Bytes, B256, U256},
};
use async_trait::async_trait;
use serde_json::{json, Value};

use ethereum_contract_mcp::{
    abi::codec,
    types::{BlockTag, FilterPayload, RawLog, TransactionPayload},
    AppError, Config, ContractDefinition, ContractServer, ContractSession, Result, RpcTransport,
};

/// Hash returned by the mock for every submitted transaction.
pub const TX_HASH: B256 = B256::repeat_byte(0xab);

/// In-memory transport that records every request and answers from canned
/// responses.
#[derive(Debug)]
pub struct MockTransport {
    pub calls: Mutex<Vec<(TransactionPayload, BlockTag)>>,
    pub sent: Mutex<Vec<TransactionPayload>>,
    pub filters: Mutex<Vec<FilterPayload>>,
    pub uninstalled: Mutex<Vec<String>>,
    call_result: Mutex<Option<Bytes>>,
    logs: Mutex<Vec<RawLog>>,
    changes: Mutex<Vec<RawLog>>,
    uninstall_result: Mutex<bool>,
    failure: Mutex<Option<AppError>>,
    next_filter: Mutex<u64>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            filters: Mutex::new(Vec::new()),
            uninstalled: Mutex::new(Vec::new()),
            call_result: Mutex::new(None),
            logs: Mutex::new(Vec::new()),
            changes: Mutex::new(Vec::new()),
            uninstall_result: Mutex::new(true),
            failure: Mutex::new(None),
            next_filter: Mutex::new(1),
        })
    }

    /// Data returned by the next `eth_call`s.
    pub fn set_call_result(&self, result: Option<Bytes>) {
        *self.call_result.lock().unwrap() = result;
    }

    /// Logs returned by `eth_getFilterLogs`.
    pub fn set_logs(&self, logs: Vec<RawLog>) {
        *self.logs.lock().unwrap() = logs;
    }

    /// Logs returned once by the next `eth_getFilterChanges`.
    pub fn push_changes(&self, logs: Vec<RawLog>) {
        self.changes.lock().unwrap().extend(logs);
    }

    pub fn set_uninstall_result(&self, result: bool) {
        *self.uninstall_result.lock().unwrap() = result;
    }

    /// Make the next request fail with an RPC error.
    pub fn fail_next(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(AppError::Rpc(message.to_string()));
    }

    /// Make the next request fail as if the node never answered.
    pub fn time_out_next(&self, after: Duration) {
        *self.failure.lock().unwrap() = Some(AppError::Timeout(after));
    }

    pub fn request_count(&self) -> usize {
        self.calls.lock().unwrap().len()
            + self.sent.lock().unwrap().len()
            + self.filters.lock().unwrap().len()
            + self.uninstalled.lock().unwrap().len()
    }

    fn check_failure(&self) -> Result<()> {
        match self.failure.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn call(&self, request: &TransactionPayload, block: BlockTag) -> Result<Option<Bytes>> {
        self.check_failure()?;
        self.calls.lock().unwrap().push((request.clone(), block));
        Ok(self.call_result.lock().unwrap().clone())
    }

    async fn send_transaction(&self, payload: &TransactionPayload) -> Result<B256> {
        self.check_failure()?;
        self.sent.lock().unwrap().push(payload.clone());
        Ok(TX_HASH)
    }

    async fn new_filter(&self, filter: &FilterPayload) -> Result<String> {
        self.check_failure()?;
        self.filters.lock().unwrap().push(filter.clone());
        let mut next = self.next_filter.lock().unwrap();
        let id = format!("0x{:x}", *next);
        *next += 1;
        Ok(id)
    }

    async fn get_filter_logs(&self, _filter_id: &str) -> Result<Vec<RawLog>> {
        self.check_failure()?;
        Ok(self.logs.lock().unwrap().clone())
    }

    async fn get_filter_changes(&self, _filter_id: &str) -> Result<Vec<RawLog>> {
        self.check_failure()?;
        Ok(std::mem::take(&mut *self.changes.lock().unwrap()))
    }

    async fn uninstall_filter(&self, filter_id: &str) -> Result<bool> {
        self.check_failure()?;
        self.uninstalled.lock().unwrap().push(filter_id.to_string());
        Ok(*self.uninstall_result.lock().unwrap())
    }
}

/// Minimal ERC-20 ABI with a constructor.
pub fn erc20_abi() -> Value {
    json!([
        {
            "type": "constructor",
            "inputs": [{"name": "supply", "type": "uint256"}],
            "stateMutability": "nonpayable"
        },
        {
            "type": "function",
            "name": "balanceOf",
            "inputs": [{"name": "owner", "type": "address"}],
            "outputs": [{"name": "", "type": "uint256"}],
            "stateMutability": "view"
        },
        {
            "type": "function",
            "name": "transfer",
            "inputs": [
                {"name": "to", "type": "address"},
                {"name": "value", "type": "uint256"}
            ],
            "outputs": [{"name": "", "type": "bool"}],
            "stateMutability": "nonpayable"
        },
        {
            "type": "event",
            "name": "Transfer",
            "anonymous": false,
            "inputs": [
                {"name": "from", "type": "address", "indexed": true},
                {"name": "to", "type": "address", "indexed": true},
                {"name": "value", "type": "uint256", "indexed": false}
            ]
        }
    ])
}

pub const TOKEN: Address = Address::repeat_byte(0xee);
pub const ALICE: Address = Address::repeat_byte(0xaa);
pub const BOB: Address = Address::repeat_byte(0xbb);

/// Session over `transport` with the ERC-20 ABI registered as "Token" and
/// bound to [`TOKEN`].
pub async fn token_session(transport: Arc<MockTransport>) -> ContractSession {
    let session = ContractSession::new(transport);
    let definition =
        ContractDefinition::new(erc20_abi()).with_bytecode(Bytes::from_static(&[0x60, 0x80]));
    session.register("Token", definition).await.unwrap();
    session.bind_address("Token", TOKEN).await.unwrap();
    session
}

/// Topic word for an address.
pub fn address_topic(address: Address) -> B256 {
    codec::encode_topic(&DynSolType::Address, &DynSolValue::Address(address)).unwrap()
}

/// Raw `Transfer(from, to, value)` log as a node would return it.
pub fn transfer_log(from: Address, to: Address, value: u64, block: u64) -> RawLog {
    RawLog {
        address: Some(TOKEN),
        topics: vec![
            codec::topic_hash("Transfer(address,address,uint256)"),
            address_topic(from),
            address_topic(to),
        ],
        data: codec::encode_tuple("(uint256)", &[DynSolValue::from(U256::from(value))]).unwrap(),
        block_number: Some(format!("0x{:x}", block)),
        block_hash: Some(B256::repeat_byte(0x01)),
        transaction_hash: Some(B256::repeat_byte(0x02)),
        transaction_index: Some("0x0".to_string()),
        log_index: Some("0x3".to_string()),
        transaction_log_index: Some("0x0".to_string()),
        removed: false,
    }
}

/// Helper to create a server against a live node from environment variables.
pub fn create_live_server() -> Option<ContractServer> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let rpc_url = std::env::var("ETHEREUM_RPC_URL").ok()?;
    if rpc_url.is_empty() {
        return None;
    }

    ContractServer::new(Config::new(rpc_url)).ok()
}

/// Skip test if server cannot be created (missing env vars).
#[macro_export]
macro_rules! skip_if_no_server {
    () => {
        match common::create_live_server() {
            Some(server) => server,
            None => {
                eprintln!("Skipping test: ETHEREUM_RPC_URL not set");
                return;
            }
        }
    };
}
