//! Error types and handling module.
//!
//! Defines all application-specific error types and conversions.

use std::time::Duration;

use rmcp::ErrorData as McpError;
use thiserror::Error;

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A contract was registered without an ABI.
    #[error("Contract '{0}' registered without an ABI")]
    MissingAbi(String),

    /// The ABI description could not be parsed.
    #[error("Invalid ABI: {0}")]
    InvalidAbi(String),

    /// Two ABI entries share the same key (overloads are not supported).
    #[error("Duplicate ABI entry '{0}': overloaded names are not supported")]
    DuplicateAbiEntry(String),

    /// Malformed Solidity type string.
    #[error("Invalid type '{ty}': {reason}")]
    InvalidType { ty: String, reason: String },

    /// Wrong number of arguments for a function or constructor.
    #[error("Argument count mismatch: expected {expected}, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    /// An argument value does not match its declared type.
    #[error("Type mismatch: value does not match type '{0}'")]
    TypeMismatch(String),

    /// Caller supplied an argument the operation cannot use.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation requires an address that was never bound.
    #[error("Contract '{0}' has no address bound")]
    MissingAddress(String),

    /// Transaction options lack a sender.
    #[error("Missing 'from' address in transaction options")]
    MissingSender,

    /// Transaction options lack a gas limit.
    #[error("Missing 'gas' in transaction options")]
    MissingGas,

    /// Deployment without bytecode, neither stored nor supplied.
    #[error("No bytecode available to deploy contract '{0}'")]
    MissingBytecode(String),

    /// Contract name not registered.
    #[error("Unknown contract: {0}")]
    UnknownContract(String),

    /// Function name not present in the contract ABI.
    #[error("Unknown method '{method}' on contract '{contract}'")]
    UnknownMethod { contract: String, method: String },

    /// Event name not present in the contract ABI.
    #[error("Unknown event '{event}' on contract '{contract}'")]
    UnknownEvent { contract: String, event: String },

    /// Filter id not installed through this session.
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    /// Invalid Ethereum address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Binary data does not decode against the given signature.
    #[error("ABI decode error: {0}")]
    AbiDecode(String),

    /// Return data of a call does not match the declared outputs.
    #[error("Contract execution error: {0}")]
    ContractExecution(String),

    /// A raw log does not match its event metadata.
    #[error("Log decode error: {0}")]
    LogDecode(String),

    /// Ethereum RPC errors (error object returned by the node).
    #[error("Ethereum RPC error: {0}")]
    Rpc(String),

    /// Transport errors.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node did not answer in time.
    #[error("RPC request timed out after {0:?}")]
    Timeout(Duration),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<alloy::transports::TransportError> for AppError {
    fn from(err: alloy::transports::TransportError) -> Self {
        match err {
            alloy::transports::RpcError::ErrorResp(payload) => AppError::Rpc(payload.to_string()),
            other => AppError::Transport(other.to_string()),
        }
    }
}

impl From<alloy::dyn_abi::Error> for AppError {
    fn from(err: alloy::dyn_abi::Error) -> Self {
        AppError::AbiDecode(err.to_string())
    }
}

impl From<alloy::hex::FromHexError> for AppError {
    fn from(err: alloy::hex::FromHexError) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(err: std::num::ParseIntError) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl AppError {
    /// Whether the error reports a missing precondition on an operation.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            AppError::MissingAddress(_)
                | AppError::MissingSender
                | AppError::MissingGas
                | AppError::MissingBytecode(_)
        )
    }
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::InvalidAddress(_)
            | AppError::InvalidType { .. }
            | AppError::ArgumentCount { .. }
            | AppError::TypeMismatch(_)
            | AppError::InvalidArgument(_)
            | AppError::UnknownContract(_)
            | AppError::UnknownMethod { .. }
            | AppError::UnknownEvent { .. }
            | AppError::UnknownFilter(_)
            | AppError::Parse(_) => McpError::invalid_params(err.to_string(), None),
            _ if err.is_precondition() => McpError::invalid_params(err.to_string(), None),
            AppError::Config(_)
            | AppError::MissingAbi(_)
            | AppError::InvalidAbi(_)
            | AppError::DuplicateAbiEntry(_) => McpError::invalid_request(err.to_string(), None),
            _ => McpError::internal_error(err.to_string(), None),
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;
