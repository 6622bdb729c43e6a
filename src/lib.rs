//! Ethereum Contract MCP Server Library
//!
//! A Model Context Protocol server for working with arbitrary Ethereum
//! contracts through a remote node's JSON-RPC interface.
//!
//! # Features
//!
//! - **ABI Codec**: Encode calls and decode results for any Solidity type
//! - **Contract Session**: Register contracts by name, call, transact and deploy
//! - **Event Filters**: Install node-side log filters and decode matching logs
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ethereum_contract_mcp::{ContractDefinition, ContractSession, EthereumClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EthereumClient::new("http://localhost:8545")?;
//!     let session = ContractSession::new(Arc::new(client));
//!     session.register("Token", ContractDefinition::new(abi_json)).await?;
//!     session.bind_address("Token", token_address).await?;
//!     let balance = session.call("Token", "balanceOf", &[owner.into()]).await?;
//!     Ok(())
//! }
//! ```

pub mod abi;
pub mod config;
pub mod error;
pub mod ethereum;
pub mod mcp;
pub mod services;
pub mod types;

pub use abi::{ContractAbi, EventMetadata};
pub use config::Config;
pub use error::{AppError, Result};
pub use ethereum::{EthereumClient, RpcTransport};
pub use mcp::ContractServer;
pub use services::{ContractDefinition, ContractSession};
