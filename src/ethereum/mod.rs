//! Ethereum interaction module.
//!
//! Contains the RPC transport seam and its HTTP client implementation.

pub mod client;
pub mod transport;

pub use client::{EthereumClient, HttpProvider};
pub use transport::RpcTransport;
