//! MCP server implementation.

use std::str::FromStr;
use std::sync::Arc;

use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::{Address, Bytes, U256},
};
use rmcp::{
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde_json::{json, Map, Value};

use crate::{
    abi::codec,
    config::Config,
    error::AppError,
    ethereum::{EthereumClient, RpcTransport},
    services::{ContractDefinition, ContractSession},
    types::{value, BlockTag, CallOutput, DecodedLog, DeployRequest, FilterCriteria, TxOptions},
};

/// Ethereum Contract MCP Server.
///
/// Exposes a [`ContractSession`] as tools: register contracts, call and
/// transact against them, and follow their events through node-side filters.
#[derive(Clone)]
pub struct ContractServer {
    session: ContractSession,
    tool_router: ToolRouter<Self>,
}

impl ContractServer {
    /// Create a server talking to the node configured in `config`.
    ///
    /// Note: This uses lazy initialization - no network calls are made during
    /// server startup.
    pub fn new(config: Config) -> Result<Self, AppError> {
        tracing::info!("Initializing Ethereum Contract MCP Server");
        let client = EthereumClient::from_config(&config)?;
        Ok(Self::with_transport(Arc::new(client)))
    }

    /// Create a server over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn RpcTransport>) -> Self {
        Self { session: ContractSession::new(transport), tool_router: Self::tool_router() }
    }

    /// The session backing the tools.
    pub fn session(&self) -> &ContractSession {
        &self.session
    }
}

/// Input parameters for the register_contract tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct RegisterContractInput {
    /// Name the contract is referred to by in other tools.
    pub name: String,
    /// JSON ABI: an array of entries, or a string containing one.
    #[serde(default)]
    pub abi: Option<Value>,
    /// Compiler artifact with `abi` and `bytecode` fields, instead of `abi`.
    #[serde(default)]
    pub artifact: Option<Value>,
    /// Optional creation bytecode (0x...).
    #[serde(default)]
    pub bytecode: Option<String>,
    /// Optional deployed address (0x...).
    #[serde(default)]
    pub address: Option<String>,
}

/// Input parameters for the set_contract_address tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct SetContractAddressInput {
    /// Registered contract name.
    pub name: String,
    /// Deployed address (0x...).
    pub address: String,
}

/// Input parameters for the call_function tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct CallFunctionInput {
    /// Registered contract name.
    pub contract: String,
    /// Function name.
    pub method: String,
    /// Positional arguments. Integers may be given as decimal or 0x strings.
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Transaction options shared by send_transaction and deploy_contract.
#[derive(Debug, Clone, Default, serde::Deserialize, schemars::JsonSchema)]
pub struct TxOptionsInput {
    /// Sender account unlocked on the node (0x...).
    #[serde(default)]
    pub from: Option<String>,
    /// Gas limit.
    #[serde(default)]
    pub gas: Option<u64>,
    /// Gas price in wei, decimal or 0x string.
    #[serde(default)]
    pub gas_price: Option<String>,
    /// Value in wei, decimal or 0x string.
    #[serde(default)]
    pub value: Option<String>,
    /// Explicit nonce.
    #[serde(default)]
    pub nonce: Option<u64>,
}

/// Input parameters for the send_transaction tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct SendTransactionInput {
    /// Registered contract name.
    pub contract: String,
    /// Function name.
    pub method: String,
    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<Value>,
    /// Transaction options; `from` and `gas` are required.
    #[serde(flatten)]
    pub options: TxOptionsInput,
}

/// Input parameters for the deploy_contract tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct DeployContractInput {
    /// Registered contract name.
    pub contract: String,
    /// Constructor arguments.
    #[serde(default)]
    pub args: Vec<Value>,
    /// Creation bytecode, overriding the one given at registration.
    #[serde(default)]
    pub bytecode: Option<String>,
    /// Transaction options; `from` and `gas` are required.
    #[serde(flatten)]
    pub options: TxOptionsInput,
}

/// Input parameters for the install_filter tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct InstallFilterInput {
    /// Registered contract name.
    pub contract: String,
    /// Event name.
    pub event: String,
    /// Indexed parameter name → value, or an array of values to match any of.
    #[serde(default)]
    pub topics: Map<String, Value>,
    /// First block: a number or "latest", "earliest", "pending".
    #[serde(default)]
    pub from_block: Option<String>,
    /// Last block, same forms as from_block.
    #[serde(default)]
    pub to_block: Option<String>,
}

/// Input parameters for tools addressing an installed filter.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct FilterIdInput {
    /// Filter id returned by install_filter.
    pub filter_id: String,
}

/// Parse and validate an Ethereum address from a string.
///
/// Accepts `0x` followed by exactly 40 hex characters.
fn parse_address(s: &str) -> Result<Address, McpError> {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return Err(McpError::invalid_params("Address cannot be empty", None));
    }

    if !trimmed.starts_with("0x") && !trimmed.starts_with("0X") {
        return Err(McpError::invalid_params(format!("Address must start with '0x': {}", s), None));
    }

    // 0x + 40 hex chars
    if trimmed.len() != 42 {
        return Err(McpError::invalid_params(
            format!(
                "Address must be 42 characters (0x + 40 hex chars), got {}: {}",
                trimmed.len(),
                s
            ),
            None,
        ));
    }

    trimmed.parse::<Address>().map_err(|e| {
        McpError::invalid_params(format!("Invalid address format '{}': {}", s, e), None)
    })
}

fn parse_bytes(field: &str, s: &str) -> Result<Bytes, McpError> {
    s.trim().parse::<Bytes>().map_err(|e| {
        McpError::invalid_params(format!("Invalid {} '{}': {}", field, s, e), None)
    })
}

fn parse_wei(field: &str, s: &str) -> Result<U256, McpError> {
    U256::from_str(s.trim()).map_err(|e| {
        McpError::invalid_params(format!("Invalid {} '{}': {}", field, s, e), None)
    })
}

fn parse_block(s: &str) -> Result<BlockTag, McpError> {
    s.parse::<BlockTag>().map_err(McpError::from)
}

impl TxOptionsInput {
    fn to_options(&self) -> Result<TxOptions, McpError> {
        let gas_price = self
            .gas_price
            .as_deref()
            .map(|s| {
                let wei = parse_wei("gas_price", s)?;
                u128::try_from(wei).map_err(|_| {
                    McpError::invalid_params(format!("gas_price out of range: {}", s), None)
                })
            })
            .transpose()?;

        Ok(TxOptions {
            from: self.from.as_deref().map(parse_address).transpose()?,
            gas: self.gas,
            gas_price,
            value: self.value.as_deref().map(|s| parse_wei("value", s)).transpose()?,
            nonce: self.nonce,
        })
    }
}

/// A JSON array stands for a list of alternatives, unless the parameter is
/// itself array-typed and the array holds a single candidate.
fn topic_candidates(ty: &DynSolType, value: &Value) -> Option<Vec<Value>> {
    let items = value.as_array()?;
    match ty {
        DynSolType::Array(_) | DynSolType::FixedArray(..) | DynSolType::Tuple(_) => {
            items.iter().all(Value::is_array).then(|| items.clone())
        }
        _ => Some(items.clone()),
    }
}

fn to_pretty_json(value: &Value) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))
}

fn call_output_json(output: &CallOutput) -> Value {
    match output {
        CallOutput::Empty => Value::Null,
        CallOutput::Values(values) => value::values_to_json(values),
    }
}

fn logs_json(logs: &[DecodedLog]) -> Value {
    Value::Array(logs.iter().map(DecodedLog::to_json).collect())
}

#[tool_router]
impl ContractServer {
    /// Register a contract ABI (and optionally bytecode and address) under a name.
    #[tool(
        description = "Register a contract under a name from its JSON ABI or a compiler artifact ({abi, bytecode}). Re-registering a name replaces it."
    )]
    pub async fn register_contract(
        &self,
        Parameters(input): Parameters<RegisterContractInput>,
    ) -> Result<String, McpError> {
        tracing::info!(name = %input.name, address = ?input.address, "register_contract called");

        let mut definition = match input.artifact {
            Some(artifact) => serde_json::from_value::<ContractDefinition>(artifact).map_err(|e| {
                McpError::invalid_params(format!("Invalid contract artifact: {}", e), None)
            })?,
            None => ContractDefinition::default(),
        };
        if input.abi.is_some() {
            definition.abi = input.abi;
        }
        if let Some(bytecode) = &input.bytecode {
            definition.bytecode = Some(parse_bytes("bytecode", bytecode)?);
        }
        let address = input.address.as_deref().map(parse_address).transpose()?;

        self.session.register(&input.name, definition).await?;
        if let Some(address) = address {
            self.session.bind_address(&input.name, address).await?;
        }

        let contract = self.session.contract(&input.name).await?;
        let mut functions: Vec<String> = contract.abi.functions().map(|f| f.signature()).collect();
        functions.sort();
        let mut events: Vec<String> = contract.abi.events().map(|e| e.signature.clone()).collect();
        events.sort();

        to_pretty_json(&json!({
            "name": contract.name,
            "address": contract.address.as_ref().map(codec::format_address),
            "has_bytecode": contract.bytecode.is_some(),
            "functions": functions,
            "events": events,
        }))
    }

    /// Bind or rebind the deployed address of a registered contract.
    #[tool(description = "Set the deployed address of a registered contract")]
    pub async fn set_contract_address(
        &self,
        Parameters(input): Parameters<SetContractAddressInput>,
    ) -> Result<String, McpError> {
        tracing::info!(name = %input.name, address = %input.address, "set_contract_address called");

        let address = parse_address(&input.address)?;
        self.session.bind_address(&input.name, address).await?;

        to_pretty_json(&json!({ "name": input.name, "address": codec::format_address(&address) }))
    }

    /// Execute a read-only call via eth_call and decode the return values.
    #[tool(
        description = "Call a contract function without a transaction (eth_call) and return its decoded outputs. Integers are returned as decimal strings."
    )]
    pub async fn call_function(
        &self,
        Parameters(input): Parameters<CallFunctionInput>,
    ) -> Result<String, McpError> {
        tracing::info!(contract = %input.contract, method = %input.method, "call_function called");

        let function = self.session.function(&input.contract, &input.method).await?;
        let args = value::from_json_args(&function.input_types, &input.args)?;
        let output = self.session.call(&input.contract, &input.method, &args).await?;

        to_pretty_json(&json!({
            "function": function.signature(),
            "result": call_output_json(&output),
        }))
    }

    /// Send a state-changing transaction from a node-managed account.
    #[tool(
        description = "Send a transaction calling a contract function (eth_sendTransaction). Requires 'from' and 'gas'. Returns the transaction hash."
    )]
    pub async fn send_transaction(
        &self,
        Parameters(input): Parameters<SendTransactionInput>,
    ) -> Result<String, McpError> {
        tracing::info!(
            contract = %input.contract,
            method = %input.method,
            from = ?input.options.from,
            "send_transaction called"
        );

        let function = self.session.function(&input.contract, &input.method).await?;
        let args = value::from_json_args(&function.input_types, &input.args)?;
        let options = input.options.to_options()?;
        let tx_hash = self.session.send(&input.contract, &input.method, &args, &options).await?;

        to_pretty_json(&json!({
            "function": function.signature(),
            "transaction_hash": tx_hash.to_string(),
        }))
    }

    /// Deploy a registered contract.
    #[tool(
        description = "Deploy a registered contract with constructor arguments. Requires 'from' and 'gas'. Returns the transaction hash."
    )]
    pub async fn deploy_contract(
        &self,
        Parameters(input): Parameters<DeployContractInput>,
    ) -> Result<String, McpError> {
        tracing::info!(contract = %input.contract, from = ?input.options.from, "deploy_contract called");

        let constructor_types = self.session.constructor_inputs(&input.contract).await?;
        let request = DeployRequest {
            options: input.options.to_options()?,
            args: value::from_json_args(&constructor_types, &input.args)?,
            bytecode: input.bytecode.as_deref().map(|s| parse_bytes("bytecode", s)).transpose()?,
        };
        let tx_hash = self.session.deploy(&input.contract, request).await?;

        to_pretty_json(&json!({
            "contract": input.contract,
            "transaction_hash": tx_hash.to_string(),
        }))
    }

    /// Install a node-side log filter for one event of a registered contract.
    #[tool(
        description = "Install a log filter for a contract event (eth_newFilter). Topics map indexed parameter names to a value or an array of alternatives. Returns the filter id."
    )]
    pub async fn install_filter(
        &self,
        Parameters(input): Parameters<InstallFilterInput>,
    ) -> Result<String, McpError> {
        tracing::info!(contract = %input.contract, event = %input.event, "install_filter called");

        let metadata = self.session.event_metadata(&input.contract, &input.event).await?;
        let mut criteria = FilterCriteria::default().blocks(
            input.from_block.as_deref().map(parse_block).transpose()?,
            input.to_block.as_deref().map(parse_block).transpose()?,
        );

        for (name, raw) in &input.topics {
            let position = metadata.indexed_position(name).ok_or_else(|| {
                McpError::invalid_params(
                    format!("'{}' is not an indexed parameter of {}", name, metadata.signature),
                    None,
                )
            })?;
            let ty = &metadata.indexed_types[position];
            criteria = match topic_candidates(ty, raw) {
                Some(candidates) => {
                    let values = candidates
                        .iter()
                        .map(|candidate| value::from_json(ty, candidate))
                        .collect::<Result<Vec<DynSolValue>, AppError>>()?;
                    criteria.topic_any(name.clone(), values)
                }
                None => criteria.topic(name.clone(), value::from_json(ty, raw)?),
            };
        }

        let filter_id = self.session.install_filter(&input.contract, &input.event, &criteria).await?;

        to_pretty_json(&json!({ "filter_id": filter_id, "event": metadata.signature }))
    }

    /// Uninstall a filter previously installed through this server.
    #[tool(description = "Uninstall a log filter (eth_uninstallFilter)")]
    pub async fn uninstall_filter(
        &self,
        Parameters(input): Parameters<FilterIdInput>,
    ) -> Result<String, McpError> {
        tracing::info!(filter_id = %input.filter_id, "uninstall_filter called");

        let removed = self.session.uninstall_filter(&input.filter_id).await?;

        to_pretty_json(&json!({ "filter_id": input.filter_id, "removed": removed }))
    }

    /// Fetch every log matching a filter, decoded.
    #[tool(description = "Fetch and decode all logs matching an installed filter (eth_getFilterLogs)")]
    pub async fn get_filter_logs(
        &self,
        Parameters(input): Parameters<FilterIdInput>,
    ) -> Result<String, McpError> {
        tracing::info!(filter_id = %input.filter_id, "get_filter_logs called");

        let logs = self.session.get_filter_logs(&input.filter_id).await?;
        to_pretty_json(&logs_json(&logs))
    }

    /// Fetch logs emitted since the last poll of a filter, decoded.
    #[tool(
        description = "Fetch and decode logs emitted since the last poll of an installed filter (eth_getFilterChanges)"
    )]
    pub async fn get_filter_changes(
        &self,
        Parameters(input): Parameters<FilterIdInput>,
    ) -> Result<String, McpError> {
        tracing::info!(filter_id = %input.filter_id, "get_filter_changes called");

        let logs = self.session.get_filter_changes(&input.filter_id).await?;
        to_pretty_json(&logs_json(&logs))
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for ContractServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "ethereum-contract-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Ethereum Contract MCP Server. Register contract ABIs, call and transact \
                 against them, and follow their events through log filters."
                    .to_string(),
            ),
        }
    }
}
