//! Business logic services module.

pub mod filter_registry;
pub mod log_decoder;
pub mod session;

pub use filter_registry::{FilterRecord, FilterRegistry};
pub use log_decoder::{address_word_hook, FieldHook, FieldHooks};
pub use session::{ContractDefinition, ContractSession, ContractState};
