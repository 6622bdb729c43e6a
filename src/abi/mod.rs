//! Contract ABI handling.
//!
//! The codec turns typed values into ABI call data and back; the registry
//! indexes a contract's JSON ABI and derives event metadata.

pub mod codec;
pub mod registry;

pub use registry::{
    AbiEntry, AbiKey, AbiParam, ConstructorEntry, ContractAbi, EventMetadata, FunctionEntry,
    StateMutability,
};
