//! Contract session.
//!
//! The single owner of every registered contract's ABI, address and
//! bytecode, and of the filters installed through it. State lives behind one
//! async `RwLock`: mutations happen inside a single write section, and
//! operations that go to the network snapshot what they need first, so a
//! failed or timed-out request never leaves partially-updated state behind.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::{Address, Bytes, B256},
};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{
    filter_registry::{self, FilterRecord, FilterRegistry},
    log_decoder::{self, FieldHook, FieldHooks},
};
use crate::{
    abi::{codec, AbiEntry, AbiKey, ContractAbi, EventMetadata, FunctionEntry},
    error::{AppError, Result},
    ethereum::RpcTransport,
    types::{
        BlockTag, CallOutput, DecodedLog, DeployRequest, FilterCriteria, RawLog,
        TransactionPayload, TxOptions,
    },
};

/// What a caller supplies to register a contract. Deserializes from
/// compiler artifacts carrying `abi` and `bytecode` (or `bin`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractDefinition {
    #[serde(default)]
    pub abi: Option<Value>,
    #[serde(default, alias = "bin")]
    pub bytecode: Option<Bytes>,
}

impl ContractDefinition {
    pub fn new(abi: Value) -> Self {
        Self { abi: Some(abi), bytecode: None }
    }

    pub fn with_bytecode(mut self, bytecode: Bytes) -> Self {
        self.bytecode = Some(bytecode);
        self
    }
}

/// Everything known about one registered contract.
#[derive(Debug, Clone)]
pub struct ContractState {
    pub name: String,
    pub abi: Arc<ContractAbi>,
    pub address: Option<Address>,
    pub bytecode: Option<Bytes>,
}

#[derive(Debug, Default)]
struct SessionState {
    contracts: HashMap<String, ContractState>,
    filters: FilterRegistry,
    hooks: FieldHooks,
}

impl SessionState {
    fn contract(&self, name: &str) -> Result<&ContractState> {
        self.contracts.get(name).ok_or_else(|| AppError::UnknownContract(name.to_string()))
    }
}

/// Handle to a contract session. Clones share the same state; separate
/// [`ContractSession::new`] calls produce independent sessions.
#[derive(Clone)]
pub struct ContractSession {
    transport: Arc<dyn RpcTransport>,
    state: Arc<RwLock<SessionState>>,
}

impl ContractSession {
    /// Create an empty session over `transport`.
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport, state: Arc::new(RwLock::new(SessionState::default())) }
    }

    /// Register (or replace) a contract under `name`.
    pub async fn register(&self, name: &str, definition: ContractDefinition) -> Result<()> {
        let abi_json = definition.abi.ok_or_else(|| AppError::MissingAbi(name.to_string()))?;
        let abi = ContractAbi::from_json(&abi_json)?;
        let entries = abi.len();

        let contract = ContractState {
            name: name.to_string(),
            abi: Arc::new(abi),
            address: None,
            bytecode: definition.bytecode,
        };

        let mut state = self.state.write().await;
        if state.contracts.insert(name.to_string(), contract).is_some() {
            tracing::info!(contract = %name, "Replacing previously registered contract");
        }
        tracing::info!(contract = %name, entries, "Contract registered");
        Ok(())
    }

    /// Bind (or rebind) the deployed address of a registered contract.
    pub async fn bind_address(&self, name: &str, address: Address) -> Result<()> {
        let mut state = self.state.write().await;
        let contract = state
            .contracts
            .get_mut(name)
            .ok_or_else(|| AppError::UnknownContract(name.to_string()))?;
        contract.address = Some(address);
        tracing::info!(contract = %name, address = %address, "Contract address bound");
        Ok(())
    }

    /// Bound address of a contract.
    pub async fn address(&self, name: &str) -> Result<Address> {
        let state = self.state.read().await;
        state.contract(name)?.address.ok_or_else(|| AppError::MissingAddress(name.to_string()))
    }

    /// Snapshot of a registered contract.
    pub async fn contract(&self, name: &str) -> Result<ContractState> {
        self.state.read().await.contract(name).cloned()
    }

    /// Names of all registered contracts, sorted.
    pub async fn contracts(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state.contracts.keys().cloned().collect();
        names.sort();
        names
    }

    /// A function entry of a registered contract.
    pub async fn function(&self, name: &str, method: &str) -> Result<FunctionEntry> {
        let contract = self.contract(name).await?;
        lookup_function(&contract, method).cloned()
    }

    /// Any ABI entry of a registered contract.
    pub async fn entry(&self, name: &str, key: &AbiKey) -> Result<Option<AbiEntry>> {
        let contract = self.contract(name).await?;
        Ok(contract.abi.entry(key).cloned())
    }

    /// Declared input types of a function.
    pub async fn method_inputs(&self, name: &str, method: &str) -> Result<Vec<DynSolType>> {
        Ok(self.function(name, method).await?.input_types)
    }

    /// Constructor input types; empty when the ABI has no constructor.
    pub async fn constructor_inputs(&self, name: &str) -> Result<Vec<DynSolType>> {
        let contract = self.contract(name).await?;
        Ok(contract.abi.constructor().map(|c| c.input_types.clone()).unwrap_or_default())
    }

    /// Metadata for an event of a registered contract.
    pub async fn event_metadata(&self, name: &str, event: &str) -> Result<Arc<EventMetadata>> {
        let contract = self.contract(name).await?;
        lookup_event(&contract, event)
    }

    /// Register post-processing for decoded log fields called `field`.
    pub async fn add_field_hook(&self, field: &str, hook: FieldHook) {
        self.state.write().await.hooks.register(field, hook);
        tracing::debug!(field = %field, "Field hook registered");
    }

    /// Deploy a registered contract, returning the transaction hash.
    pub async fn deploy(&self, name: &str, request: DeployRequest) -> Result<B256> {
        let contract = self.contract(name).await?;
        let constructor_types =
            contract.abi.constructor().map(|c| c.input_types.clone()).unwrap_or_default();
        if request.args.len() != constructor_types.len() {
            return Err(AppError::ArgumentCount {
                expected: constructor_types.len(),
                actual: request.args.len(),
            });
        }

        require_sender_and_gas(&request.options)?;
        let bytecode = request
            .bytecode
            .or(contract.bytecode)
            .ok_or_else(|| AppError::MissingBytecode(name.to_string()))?;

        let args = codec::encode_values(&constructor_types, &request.args)?;
        let mut data = Vec::with_capacity(bytecode.len() + args.len());
        data.extend_from_slice(&bytecode);
        data.extend_from_slice(&args);

        let payload = TransactionPayload::new(None, &data).with_options(&request.options);
        let tx_hash = self.transport.send_transaction(&payload).await?;

        tracing::info!(contract = %name, tx_hash = %tx_hash, "Deployment submitted");
        Ok(tx_hash)
    }

    /// Execute a read-only call and decode its return values.
    ///
    /// An empty or `null` result yields [`CallOutput::Empty`]; return data
    /// that does not match the declared outputs is reported as
    /// [`AppError::ContractExecution`].
    pub async fn call(
        &self,
        name: &str,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<CallOutput> {
        let (address, function) = self.resolve_method(name, method).await?;
        let data = codec::encode_call(function.selector, &function.input_types, args)?;
        let request = TransactionPayload::new(Some(&address), &data);

        tracing::debug!(contract = %name, method = %method, to = %address, "eth_call");
        let result = self.transport.call(&request, BlockTag::Latest).await?;

        match result {
            Some(bytes) if !bytes.is_empty() => {
                let signature = function.output_signature();
                codec::decode_tuple(&signature, &bytes).map(CallOutput::Values).map_err(|e| {
                    AppError::ContractExecution(format!(
                        "{}.{} returned data not matching {}: {}",
                        name, method, signature, e
                    ))
                })
            }
            _ => {
                tracing::debug!(contract = %name, method = %method, "Call returned no data");
                Ok(CallOutput::Empty)
            }
        }
    }

    /// Send a state-changing transaction, returning its hash.
    pub async fn send(
        &self,
        name: &str,
        method: &str,
        args: &[DynSolValue],
        options: &TxOptions,
    ) -> Result<B256> {
        let (address, function) = self.resolve_method(name, method).await?;
        require_sender_and_gas(options)?;

        if function.state_mutability.is_read_only() {
            tracing::warn!(contract = %name, method = %method, "Sending a transaction to a read-only function");
        }

        let data = codec::encode_call(function.selector, &function.input_types, args)?;
        let payload = TransactionPayload::new(Some(&address), &data).with_options(options);
        let tx_hash = self.transport.send_transaction(&payload).await?;

        tracing::info!(contract = %name, method = %method, tx_hash = %tx_hash, "Transaction submitted");
        Ok(tx_hash)
    }

    /// Install a log filter for `event` on the node and remember it.
    pub async fn install_filter(
        &self,
        name: &str,
        event: &str,
        criteria: &FilterCriteria,
    ) -> Result<String> {
        let contract = self.contract(name).await?;
        let metadata = lookup_event(&contract, event)?;
        if contract.address.is_none() {
            tracing::debug!(contract = %name, "No address bound, filter matches any emitter");
        }

        let payload = filter_registry::build_filter(contract.address.as_ref(), &metadata, criteria)?;
        let filter_id = self.transport.new_filter(&payload).await?;

        let record = FilterRecord {
            filter_id: filter_id.clone(),
            contract_name: name.to_string(),
            event_name: event.to_string(),
            metadata,
        };
        self.state.write().await.filters.insert(record);

        tracing::info!(contract = %name, event = %event, filter_id = %filter_id, "Filter installed");
        Ok(filter_id)
    }

    /// Uninstall a filter on the node and forget it locally.
    ///
    /// Returns the node's answer; `false` means the node had already dropped it.
    pub async fn uninstall_filter(&self, filter_id: &str) -> Result<bool> {
        if !self.state.read().await.filters.contains(filter_id) {
            return Err(AppError::UnknownFilter(filter_id.to_string()));
        }

        let removed = self.transport.uninstall_filter(filter_id).await?;
        if !removed {
            tracing::warn!(filter_id = %filter_id, "Node no longer knew the filter");
        }

        self.state.write().await.filters.remove(filter_id);
        tracing::info!(filter_id = %filter_id, "Filter uninstalled");
        Ok(removed)
    }

    /// Installed filter record.
    pub async fn filter(&self, filter_id: &str) -> Result<FilterRecord> {
        self.state.read().await.filters.get(filter_id).cloned()
    }

    /// Ids of all installed filters, sorted.
    pub async fn filters(&self) -> Vec<String> {
        self.state.read().await.filters.ids()
    }

    /// Fetch and decode every log matching a filter.
    pub async fn get_filter_logs(&self, filter_id: &str) -> Result<Vec<DecodedLog>> {
        let (record, hooks) = self.filter_snapshot(filter_id).await?;
        let raw_logs = self.transport.get_filter_logs(filter_id).await?;
        tracing::debug!(filter_id = %filter_id, count = raw_logs.len(), "Fetched filter logs");
        log_decoder::decode_logs(&raw_logs, &record.metadata, &hooks)
    }

    /// Fetch and decode logs emitted since the last poll of a filter.
    pub async fn get_filter_changes(&self, filter_id: &str) -> Result<Vec<DecodedLog>> {
        let (record, hooks) = self.filter_snapshot(filter_id).await?;
        let raw_logs = self.transport.get_filter_changes(filter_id).await?;
        tracing::debug!(filter_id = %filter_id, count = raw_logs.len(), "Fetched filter changes");
        log_decoder::decode_logs(&raw_logs, &record.metadata, &hooks)
    }

    /// Decode logs fetched by the caller for a filter installed here.
    pub async fn decode_logs(&self, filter_id: &str, raw_logs: &[RawLog]) -> Result<Vec<DecodedLog>> {
        let (record, hooks) = self.filter_snapshot(filter_id).await?;
        log_decoder::decode_logs(raw_logs, &record.metadata, &hooks)
    }

    async fn filter_snapshot(&self, filter_id: &str) -> Result<(FilterRecord, FieldHooks)> {
        let state = self.state.read().await;
        let record = state.filters.get(filter_id)?.clone();
        Ok((record, state.hooks.clone()))
    }

    async fn resolve_method(&self, name: &str, method: &str) -> Result<(Address, FunctionEntry)> {
        let contract = self.contract(name).await?;
        let address = contract.address.ok_or_else(|| AppError::MissingAddress(name.to_string()))?;
        let function = lookup_function(&contract, method)?.clone();
        Ok((address, function))
    }
}

fn lookup_function<'a>(contract: &'a ContractState, method: &str) -> Result<&'a FunctionEntry> {
    contract.abi.function(method).ok_or_else(|| AppError::UnknownMethod {
        contract: contract.name.clone(),
        method: method.to_string(),
    })
}

fn lookup_event(contract: &ContractState, event: &str) -> Result<Arc<EventMetadata>> {
    contract.abi.event(event).cloned().ok_or_else(|| AppError::UnknownEvent {
        contract: contract.name.clone(),
        event: event.to_string(),
    })
}

fn require_sender_and_gas(options: &TxOptions) -> Result<()> {
    if options.from.is_none() {
        return Err(AppError::MissingSender);
    }
    if options.gas.is_none() {
        return Err(AppError::MissingGas);
    }
    Ok(())
}

impl std::fmt::Debug for ContractSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractSession").finish_non_exhaustive()
    }
}
