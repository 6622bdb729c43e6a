//! MCP server module.
//!
//! Contains the MCP server implementation with tool handlers.

pub mod server;

pub use server::ContractServer;
pub use server::{
    CallFunctionInput, DeployContractInput, FilterIdInput, InstallFilterInput,
    RegisterContractInput, SendTransactionInput, SetContractAddressInput, TxOptionsInput,
};
